//! Persistence boundary. Handlers and services only see this trait.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::Result;
use crate::models::{DownloadToken, Order, OrderStatus, Product, StoreSettings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fields a payment notice or staff edit may change. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
  pub status: Option<OrderStatus>,
  pub payment_ref: Option<String>,
  pub invoice_url: Option<String>,
}

impl OrderPatch {
  pub fn is_empty(&self) -> bool {
    self.status.is_none() && self.payment_ref.is_none() && self.invoice_url.is_none()
  }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
  pub status: Option<OrderStatus>,
  pub gateway: Option<String>,
  pub from: Option<DateTime<Utc>>,
  pub to: Option<DateTime<Utc>>,
}

impl OrderFilter {
  pub fn matches(&self, order: &Order) -> bool {
    self.status.map_or(true, |s| order.status == s)
      && self.gateway.as_deref().map_or(true, |g| order.payment_gateway.as_str() == g)
      && self.from.map_or(true, |from| order.created_at >= from)
      && self.to.map_or(true, |to| order.created_at <= to)
  }
}

#[async_trait]
pub trait Store: Send + Sync {
  /// Most recently written settings row, if any.
  async fn load_settings(&self) -> Result<Option<StoreSettings>>;
  async fn save_settings(&self, settings: &StoreSettings) -> Result<()>;

  async fn list_products(&self, active_only: bool) -> Result<Vec<Product>>;
  async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
  /// Inserts or replaces by id.
  async fn upsert_product(&self, product: &Product) -> Result<()>;

  /// Fails with `Conflict` when the order number is taken.
  async fn insert_order(&self, order: &Order) -> Result<()>;
  async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;
  async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>>;
  /// Applies `patch` to the order and bumps `updated_at`. `None` if no such order.
  async fn update_order(&self, order_number: &str, patch: &OrderPatch, now: DateTime<Utc>) -> Result<Option<Order>>;
  /// Newest first.
  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>>;
  async fn count_orders(&self, status: Option<OrderStatus>) -> Result<i64>;

  /// Deletes every token of `order_id` and inserts `tokens`, as one unit.
  async fn replace_tokens(&self, order_id: Uuid, tokens: &[DownloadToken]) -> Result<()>;
  async fn tokens_for_order(&self, order_id: Uuid) -> Result<Vec<DownloadToken>>;
  async fn find_token(&self, token: &str) -> Result<Option<DownloadToken>>;
  /// Increments the download count only while the token is unexpired and
  /// below its limit at `now`. Returns the updated token, or `None` if the
  /// condition no longer held.
  async fn consume_token(&self, token_id: Uuid, now: DateTime<Utc>) -> Result<Option<DownloadToken>>;
}
