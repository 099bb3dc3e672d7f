use crate::errors::AppError;
use crate::services::auth_service;
use crate::state::AppState;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

/// Proof that the request carried the staff bearer token.
#[derive(Debug, Clone, Copy)]
pub struct StaffSession;

fn authorize(req: &HttpRequest) -> Result<StaffSession, AppError> {
  let unauthorized = || AppError::Unauthorized("Unauthorized".to_string());

  let app_state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("application state is not configured".to_string()))?;
  let Some(stored_hash) = app_state.config.admin_token_hash.as_deref() else {
    warn!("Admin request rejected: ADMIN_TOKEN_HASH is not set.");
    return Err(unauthorized());
  };

  let token = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(str::trim)
    .ok_or_else(unauthorized)?;

  if auth_service::verify_token(stored_hash, token)? {
    Ok(StaffSession)
  } else {
    Err(unauthorized())
  }
}

impl FromRequest for StaffSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(authorize(req))
  }
}
