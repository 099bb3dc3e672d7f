use crate::errors::AppError;
use crate::services::payments;
use crate::state::AppState;
use crate::webhooks::WebhookSource;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

#[instrument(name = "handler::duitku_webhook", skip_all)]
pub async fn duitku_webhook_handler(app_state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, AppError> {
  let message = payments::handle_duitku_callback(app_state.get_ref(), &body, Utc::now()).await?;
  Ok(HttpResponse::Ok().json(json!({ "received": true, "message": message })))
}

#[instrument(name = "handler::redirect_webhook", skip(app_state, body))]
pub async fn redirect_webhook_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let source: WebhookSource = path.into_inner().parse()?;
  payments::handle_redirect_webhook(app_state.get_ref(), source, &body, Utc::now()).await?;
  Ok(HttpResponse::Ok().json(json!({ "received": true })))
}

/// Auto-QRIS settles by polling; the worker's push is only acknowledged.
#[instrument(name = "handler::auto_qris_webhook", skip_all)]
pub async fn auto_qris_webhook_handler(body: web::Bytes) -> HttpResponse {
  info!(bytes = body.len(), "Auto QRIS notification acknowledged.");
  HttpResponse::Ok().json(json!({ "received": true }))
}

pub async fn auto_qris_ping_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "ok": true }))
}
