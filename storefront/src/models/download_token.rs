use crate::errors::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const TOKEN_LENGTH: usize = 40;
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DownloadToken {
  pub id: Uuid,
  pub token: String,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub expires_at: DateTime<Utc>,
  pub max_downloads: i32,
  pub times_downloaded: i32,
  pub created_at: DateTime<Utc>,
}

impl DownloadToken {
  /// Fails when `now + expiry_hours` falls outside the representable range.
  pub fn issue(
    order_id: Uuid,
    product_id: Uuid,
    now: DateTime<Utc>,
    expiry_hours: i64,
    max_downloads: i32,
  ) -> Result<Self> {
    let expires_at = Duration::try_hours(expiry_hours)
      .and_then(|ttl| now.checked_add_signed(ttl))
      .ok_or_else(|| AppError::Config(format!("Download expiry of {} hours is out of range", expiry_hours)))?;
    Ok(Self {
      id: Uuid::new_v4(),
      token: generate_token(),
      order_id,
      product_id,
      expires_at,
      max_downloads,
      times_downloaded: 0,
      created_at: now,
    })
  }

  pub fn is_exhausted(&self) -> bool {
    self.times_downloaded >= self.max_downloads
  }

  /// Expiry is inclusive: a token is dead at exactly `expires_at`.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }

  pub fn remaining(&self) -> i32 {
    (self.max_downloads - self.times_downloaded).max(0)
  }
}

/// 40 URL-safe characters from the OS-seeded thread RNG (~240 bits).
pub fn generate_token() -> String {
  let mut rng = rand::rng();
  (0..TOKEN_LENGTH)
    .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
    .collect()
}
