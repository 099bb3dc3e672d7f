//! Staff bearer-token hashing and verification.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};

/// Hashes a staff token into the PHC string stored in `ADMIN_TOKEN_HASH`.
#[instrument(name = "auth_service::hash_token", skip(token), err(Display))]
pub fn hash_token(token: &str) -> Result<String, AppError> {
  if token.trim().is_empty() {
    return Err(AppError::Validation("Token cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(token.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 hashing failed.");
      AppError::Internal(format!("Token hashing failed: {}", e))
    })
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
#[instrument(name = "auth_service::verify_token", skip_all, err(Display))]
pub fn verify_token(stored_hash: &str, provided: &str) -> Result<bool, AppError> {
  if provided.is_empty() {
    return Ok(false);
  }

  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "ADMIN_TOKEN_HASH is not a valid PHC string.");
    AppError::Config(format!("Invalid admin token hash: {}", e))
  })?;

  match Argon2::default().verify_password(provided.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Staff token mismatch.");
      Ok(false)
    }
    Err(e) => {
      error!(error = %e, "Argon2 verification failed.");
      Err(AppError::Internal(format!("Token verification failed: {}", e)))
    }
  }
}
