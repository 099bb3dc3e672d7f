use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub slug: String,
  pub title: String,
  pub description: Option<String>,
  pub price: i64,
  pub sale_price: Option<i64>,
  pub is_active: bool,
  /// Object key of the deliverable file, resolved to a URL at download time.
  #[serde(skip_serializing)]
  pub file_key: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  /// Sale price when present, list price otherwise.
  pub fn effective_price(&self) -> i64 {
    self.sale_price.unwrap_or(self.price)
  }
}
