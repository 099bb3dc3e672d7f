use crate::errors::AppError;
use crate::services::payments;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAutoQrisRequest {
  pub order_number: String,
  pub combined_amount: String,
}

#[instrument(name = "handler::verify_auto_qris", skip(app_state))]
pub async fn verify_auto_qris_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<VerifyAutoQrisRequest>,
) -> Result<HttpResponse, AppError> {
  let paid = payments::verify_auto_qris(
    app_state.get_ref(),
    &payload.order_number,
    &payload.combined_amount,
    Utc::now(),
  )
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "paid": paid })))
}
