use crate::errors::AppError;
use crate::models::OrderStatus;
use crate::services::metrics;
use crate::services::orders::{self, AdminOrderUpdate};
use crate::state::AppState;
use crate::store::OrderFilter;
use crate::web::extractors::StaffSession;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
  pub status: Option<OrderStatus>,
  pub gateway: Option<String>,
  pub from: Option<DateTime<Utc>>,
  pub to: Option<DateTime<Utc>>,
}

impl From<OrderListQuery> for OrderFilter {
  fn from(query: OrderListQuery) -> Self {
    OrderFilter {
      status: query.status,
      gateway: query.gateway.filter(|g| !g.is_empty()),
      from: query.from,
      to: query.to,
    }
  }
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, _staff))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  _staff: StaffSession,
  query: web::Query<OrderListQuery>,
) -> Result<HttpResponse, AppError> {
  let filter = OrderFilter::from(query.into_inner());
  let orders = app_state.store.list_orders(&filter).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::admin_get_order", skip(app_state, _staff))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  _staff: StaffSession,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .store
    .find_order(path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::admin_update_order", skip(app_state, _staff, payload))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  _staff: StaffSession,
  path: web::Path<Uuid>,
  payload: web::Json<AdminOrderUpdate>,
) -> Result<HttpResponse, AppError> {
  let order = orders::admin_update_order(app_state.get_ref(), path.into_inner(), payload.into_inner(), Utc::now()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::admin_metrics", skip(app_state, _staff))]
pub async fn metrics_handler(app_state: web::Data<AppState>, _staff: StaffSession) -> Result<HttpResponse, AppError> {
  let dashboard = metrics::dashboard_metrics(app_state.store.as_ref(), Utc::now()).await?;
  Ok(HttpResponse::Ok().json(dashboard))
}
