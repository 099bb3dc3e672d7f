use super::{OrderFilter, OrderPatch, Store};
use crate::errors::{AppError, Result};
use crate::models::{DownloadToken, Order, OrderStatus, Product, StoreSettings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, instrument, warn};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_number, items, customer, total, status, payment_gateway, payment_ref, invoice_url, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, slug, title, description, price, sale_price, is_active, file_key, created_at, updated_at";
const TOKEN_COLUMNS: &str = "id, token, order_id, product_id, expires_at, max_downloads, times_downloaded, created_at";

#[derive(FromRow)]
struct SettingsRow {
  store_name: String,
  contact_email: String,
  payment: Json<serde_json::Value>,
  storage: Json<serde_json::Value>,
  policy: Json<serde_json::Value>,
}

/// A malformed blob falls back to defaults instead of taking the store down.
fn decode_blob<T: DeserializeOwned + Default>(column: &str, value: serde_json::Value) -> T {
  serde_json::from_value(value).unwrap_or_else(|e| {
    warn!(column, error = %e, "Settings blob is malformed, using defaults.");
    T::default()
  })
}

fn map_unique_violation(e: sqlx::Error, what: &str) -> AppError {
  if let sqlx::Error::Database(db_err) = &e {
    if db_err.is_unique_violation() {
      return AppError::Conflict(format!("{} already exists", what));
    }
  }
  error!(error = %e, "Database write failed.");
  AppError::Sqlx(e)
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

#[async_trait]
impl Store for PgStore {
  #[instrument(name = "PgStore::load_settings", skip(self), err(Display))]
  async fn load_settings(&self) -> Result<Option<StoreSettings>> {
    let row: Option<SettingsRow> = sqlx::query_as(
      "SELECT store_name, contact_email, payment, storage, policy FROM store_settings ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_optional(&self.pool)
    .await?;

    Ok(row.map(|row| StoreSettings {
      store_name: row.store_name,
      contact_email: row.contact_email,
      payment: decode_blob("payment", row.payment.0),
      storage: decode_blob("storage", row.storage.0),
      policy: decode_blob("policy", row.policy.0),
    }))
  }

  async fn save_settings(&self, settings: &StoreSettings) -> Result<()> {
    sqlx::query(
      "INSERT INTO store_settings (id, store_name, contact_email, payment, storage, policy, created_at) VALUES ($1, $2, $3, $4, $5, $6, now())",
    )
    .bind(Uuid::new_v4())
    .bind(&settings.store_name)
    .bind(&settings.contact_email)
    .bind(Json(&settings.payment))
    .bind(Json(&settings.storage))
    .bind(Json(&settings.policy))
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn list_products(&self, active_only: bool) -> Result<Vec<Product>> {
    let sql = if active_only {
      format!("SELECT {} FROM products WHERE is_active ORDER BY title ASC", PRODUCT_COLUMNS)
    } else {
      format!("SELECT {} FROM products ORDER BY title ASC", PRODUCT_COLUMNS)
    };
    Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn upsert_product(&self, p: &Product) -> Result<()> {
    sqlx::query(
      "INSERT INTO products (id, slug, title, description, price, sale_price, is_active, file_key, created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
       ON CONFLICT (id) DO UPDATE SET slug = EXCLUDED.slug, title = EXCLUDED.title, description = EXCLUDED.description,
         price = EXCLUDED.price, sale_price = EXCLUDED.sale_price, is_active = EXCLUDED.is_active,
         file_key = EXCLUDED.file_key, updated_at = EXCLUDED.updated_at",
    )
    .bind(p.id)
    .bind(&p.slug)
    .bind(&p.title)
    .bind(&p.description)
    .bind(p.price)
    .bind(p.sale_price)
    .bind(p.is_active)
    .bind(&p.file_key)
    .bind(p.created_at)
    .bind(p.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| map_unique_violation(e, "product slug"))?;
    Ok(())
  }

  #[instrument(name = "PgStore::insert_order", skip(self, order), fields(order_number = %order.order_number), err(Display))]
  async fn insert_order(&self, order: &Order) -> Result<()> {
    sqlx::query(
      "INSERT INTO orders (id, order_number, items, customer, total, status, payment_gateway, payment_ref, invoice_url, created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(Json(&order.items))
    .bind(Json(&order.customer))
    .bind(order.total)
    .bind(order.status)
    .bind(order.payment_gateway.as_str())
    .bind(&order.payment_ref)
    .bind(&order.invoice_url)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| map_unique_violation(e, "order number"))?;
    Ok(())
  }

  async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE order_number = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(order_number).fetch_optional(&self.pool).await?)
  }

  #[instrument(name = "PgStore::update_order", skip(self, patch, now), err(Display))]
  async fn update_order(&self, order_number: &str, patch: &OrderPatch, now: DateTime<Utc>) -> Result<Option<Order>> {
    let sql = format!(
      "UPDATE orders SET status = COALESCE($2, status), payment_ref = COALESCE($3, payment_ref),
         invoice_url = COALESCE($4, invoice_url), updated_at = $5
       WHERE order_number = $1 RETURNING {}",
      ORDER_COLUMNS
    );
    Ok(
      sqlx::query_as(&sql)
        .bind(order_number)
        .bind(patch.status)
        .bind(&patch.payment_ref)
        .bind(&patch.invoice_url)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM orders WHERE TRUE", ORDER_COLUMNS));
    if let Some(status) = filter.status {
      qb.push(" AND status = ").push_bind(status);
    }
    if let Some(gateway) = &filter.gateway {
      qb.push(" AND payment_gateway = ").push_bind(gateway.clone());
    }
    if let Some(from) = filter.from {
      qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
      qb.push(" AND created_at <= ").push_bind(to);
    }
    qb.push(" ORDER BY created_at DESC");
    Ok(qb.build_query_as::<Order>().fetch_all(&self.pool).await?)
  }

  async fn count_orders(&self, status: Option<OrderStatus>) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)")
      .bind(status)
      .fetch_one(&self.pool)
      .await?;
    Ok(count)
  }

  #[instrument(name = "PgStore::replace_tokens", skip(self, tokens), fields(count = tokens.len()), err(Display))]
  async fn replace_tokens(&self, order_id: Uuid, tokens: &[DownloadToken]) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    sqlx::query("DELETE FROM download_tokens WHERE order_id = $1")
      .bind(order_id)
      .execute(&mut *tx)
      .await?;
    for t in tokens {
      sqlx::query(
        "INSERT INTO download_tokens (id, token, order_id, product_id, expires_at, max_downloads, times_downloaded, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
      )
      .bind(t.id)
      .bind(&t.token)
      .bind(t.order_id)
      .bind(t.product_id)
      .bind(t.expires_at)
      .bind(t.max_downloads)
      .bind(t.times_downloaded)
      .bind(t.created_at)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(())
  }

  async fn tokens_for_order(&self, order_id: Uuid) -> Result<Vec<DownloadToken>> {
    let sql = format!(
      "SELECT {} FROM download_tokens WHERE order_id = $1 ORDER BY created_at ASC",
      TOKEN_COLUMNS
    );
    Ok(sqlx::query_as(&sql).bind(order_id).fetch_all(&self.pool).await?)
  }

  async fn find_token(&self, token: &str) -> Result<Option<DownloadToken>> {
    let sql = format!("SELECT {} FROM download_tokens WHERE token = $1", TOKEN_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(token).fetch_optional(&self.pool).await?)
  }

  async fn consume_token(&self, token_id: Uuid, now: DateTime<Utc>) -> Result<Option<DownloadToken>> {
    let sql = format!(
      "UPDATE download_tokens SET times_downloaded = times_downloaded + 1
       WHERE id = $1 AND times_downloaded < max_downloads AND expires_at > $2
       RETURNING {}",
      TOKEN_COLUMNS
    );
    Ok(sqlx::query_as(&sql).bind(token_id).bind(now).fetch_optional(&self.pool).await?)
  }
}
