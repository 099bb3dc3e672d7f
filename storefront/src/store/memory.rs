use super::{OrderFilter, OrderPatch, Store};
use crate::errors::{AppError, Result};
use crate::models::{DownloadToken, Order, OrderStatus, Product, StoreSettings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  settings: Option<StoreSettings>,
  products: HashMap<Uuid, Product>,
  orders: HashMap<Uuid, Order>,
  tokens: HashMap<Uuid, DownloadToken>,
}

/// Process-local store. Every operation holds one lock, which gives the same
/// atomicity the Postgres store gets from transactions and conditional updates.
#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn load_settings(&self) -> Result<Option<StoreSettings>> {
    Ok(self.tables.read().settings.clone())
  }

  async fn save_settings(&self, settings: &StoreSettings) -> Result<()> {
    self.tables.write().settings = Some(settings.clone());
    Ok(())
  }

  async fn list_products(&self, active_only: bool) -> Result<Vec<Product>> {
    let mut products: Vec<Product> = self
      .tables
      .read()
      .products
      .values()
      .filter(|p| !active_only || p.is_active)
      .cloned()
      .collect();
    products.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(products)
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.read().products.get(&id).cloned())
  }

  async fn upsert_product(&self, product: &Product) -> Result<()> {
    let mut tables = self.tables.write();
    if tables.products.values().any(|p| p.slug == product.slug && p.id != product.id) {
      return Err(AppError::Conflict("product slug already exists".to_string()));
    }
    tables.products.insert(product.id, product.clone());
    Ok(())
  }

  async fn insert_order(&self, order: &Order) -> Result<()> {
    let mut tables = self.tables.write();
    if tables.orders.values().any(|o| o.order_number == order.order_number) {
      return Err(AppError::Conflict("order number already exists".to_string()));
    }
    tables.orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.read().orders.get(&id).cloned())
  }

  async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
    Ok(
      self
        .tables
        .read()
        .orders
        .values()
        .find(|o| o.order_number == order_number)
        .cloned(),
    )
  }

  async fn update_order(&self, order_number: &str, patch: &OrderPatch, now: DateTime<Utc>) -> Result<Option<Order>> {
    let mut tables = self.tables.write();
    let Some(order) = tables.orders.values_mut().find(|o| o.order_number == order_number) else {
      return Ok(None);
    };
    if let Some(status) = patch.status {
      order.status = status;
    }
    if let Some(payment_ref) = &patch.payment_ref {
      order.payment_ref = Some(payment_ref.clone());
    }
    if let Some(invoice_url) = &patch.invoice_url {
      order.invoice_url = Some(invoice_url.clone());
    }
    order.updated_at = now;
    Ok(Some(order.clone()))
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .tables
      .read()
      .orders
      .values()
      .filter(|o| filter.matches(o))
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn count_orders(&self, status: Option<OrderStatus>) -> Result<i64> {
    let tables = self.tables.read();
    let count = tables
      .orders
      .values()
      .filter(|o| status.map_or(true, |s| o.status == s))
      .count();
    Ok(count as i64)
  }

  async fn replace_tokens(&self, order_id: Uuid, tokens: &[DownloadToken]) -> Result<()> {
    let mut tables = self.tables.write();
    tables.tokens.retain(|_, t| t.order_id != order_id);
    for token in tokens {
      tables.tokens.insert(token.id, token.clone());
    }
    Ok(())
  }

  async fn tokens_for_order(&self, order_id: Uuid) -> Result<Vec<DownloadToken>> {
    let mut tokens: Vec<DownloadToken> = self
      .tables
      .read()
      .tokens
      .values()
      .filter(|t| t.order_id == order_id)
      .cloned()
      .collect();
    tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(tokens)
  }

  async fn find_token(&self, token: &str) -> Result<Option<DownloadToken>> {
    Ok(self.tables.read().tokens.values().find(|t| t.token == token).cloned())
  }

  async fn consume_token(&self, token_id: Uuid, now: DateTime<Utc>) -> Result<Option<DownloadToken>> {
    let mut tables = self.tables.write();
    match tables.tokens.get_mut(&token_id) {
      Some(t) if !t.is_exhausted() && !t.is_expired_at(now) => {
        t.times_downloaded += 1;
        Ok(Some(t.clone()))
      }
      _ => Ok(None),
    }
  }
}
