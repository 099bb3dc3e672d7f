use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use digistore_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Signature rejected: {0}")]
  Signature(String),

  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Download link expired")]
  TokenExpired,

  #[error("Download quota exhausted")]
  TokenExhausted,

  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Storage Resolution Error: {0}")]
  StorageResolution(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Email Delivery Error: {0}")]
  Email(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<sqlx::Error>() {
        Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
        Err(other) => AppError::Internal(other.to_string()),
      },
    }
  }
}

impl AppError {
  /// Message shown to the caller. Server-side failures get a generic text.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m)
      | AppError::Signature(m)
      | AppError::Unauthorized(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::StorageResolution(m) => m.clone(),
      AppError::TokenExpired => "Link unduhan sudah kadaluarsa.".to_string(),
      AppError::TokenExhausted => "Kuota unduhan telah habis. Silakan hubungi support.".to_string(),
      AppError::Gateway(m) => format!("Payment gateway error: {}", m),
      AppError::Config(_) => "Service is not configured correctly.".to_string(),
      AppError::Sqlx(_) => "Database operation failed.".to_string(),
      AppError::Email(_) | AppError::Workflow { .. } | AppError::Internal(_) => "An internal error occurred.".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::Signature(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::TokenExpired | AppError::TokenExhausted => StatusCode::GONE,
      AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
      AppError::StorageResolution(_)
      | AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Email(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with server error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with client error");
    }
    HttpResponse::build(status).json(json!({ "error": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
