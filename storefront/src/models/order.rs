use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

use super::settings::GatewayKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Paid,
  Failed,
  Refunded,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Paid => "paid",
      OrderStatus::Failed => "failed",
      OrderStatus::Refunded => "refunded",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(OrderStatus::Pending),
      "paid" => Ok(OrderStatus::Paid),
      "failed" => Ok(OrderStatus::Failed),
      "refunded" => Ok(OrderStatus::Refunded),
      other => Err(format!("unknown order status '{}'", other)),
    }
  }
}

/// Price snapshot of a product at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Uuid,
  pub title: String,
  pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
  pub name: String,
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  #[sqlx(json)]
  pub items: Vec<OrderItem>,
  #[sqlx(json)]
  pub customer: CustomerSnapshot,
  pub total: i64,
  pub status: OrderStatus,
  #[sqlx(try_from = "String")]
  pub payment_gateway: GatewayKind,
  pub payment_ref: Option<String>,
  /// Free-form gateway metadata. Auto-QRIS stores the amount triple here as JSON.
  pub invoice_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// A fresh `pending` order. `total` is derived from `items`.
  pub fn new_pending(
    order_number: String,
    items: Vec<OrderItem>,
    customer: CustomerSnapshot,
    payment_gateway: GatewayKind,
    now: DateTime<Utc>,
  ) -> Self {
    let total = items.iter().map(|item| item.price).sum();
    Self {
      id: Uuid::new_v4(),
      order_number,
      items,
      customer,
      total,
      status: OrderStatus::Pending,
      payment_gateway,
      payment_ref: None,
      invoice_url: None,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Low 24 bits give the suffix; seeded randomly so restarts do not replay.
static ORDER_SEQUENCE: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rand::rng().random::<u32>()));

/// `INV-<yyyyMMddHHmmss>-<6 uppercase hex>`.
///
/// Within one process the suffix cycles through 2^24 values before repeating,
/// so numbers generated in the same second never collide. Across processes the
/// store's unique index is the final arbiter.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
  let seq = ORDER_SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;
  format!("INV-{}-{:06X}", now.format("%Y%m%d%H%M%S"), seq)
}
