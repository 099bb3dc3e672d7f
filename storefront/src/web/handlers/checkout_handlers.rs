use crate::errors::AppError;
use crate::services::orders::{self, CheckoutRequest};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use tracing::instrument;

#[instrument(name = "handler::checkout", skip(app_state, payload))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  let response = orders::checkout(app_state.get_ref(), payload.into_inner(), Utc::now()).await?;
  Ok(HttpResponse::Ok().json(response))
}
