use crate::errors::AppError;
use crate::services::downloads;
use crate::state::AppState;
use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;
use tracing::instrument;

#[instrument(name = "handler::download", skip_all)]
pub async fn download_handler(app_state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
  let token = path.into_inner();
  let storage = app_state.settings().await?.map(|s| s.storage);
  let location = downloads::redeem(
    app_state.store.as_ref(),
    storage.as_ref(),
    &app_state.config.app_base_url,
    &token,
    Utc::now(),
  )
  .await?;

  Ok(HttpResponse::Found()
    .insert_header((header::LOCATION, location.url))
    .finish())
}
