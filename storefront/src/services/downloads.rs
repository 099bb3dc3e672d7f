//! Token-gated file delivery.

use crate::errors::{AppError, Result};
use crate::models::{DownloadToken, StorageSettings};
use crate::services::storage;
use crate::store::Store;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct FileLocation {
  pub url: String,
  pub token: DownloadToken,
}

/// Validates `token`, resolves its file and consumes one download.
///
/// Nothing is consumed unless every check passes and the URL resolves. A
/// concurrent redemption that takes the last download first is reported as
/// exhausted.
#[instrument(name = "downloads::redeem", skip_all)]
pub async fn redeem(
  store: &dyn Store,
  storage_settings: Option<&StorageSettings>,
  app_base_url: &str,
  token: &str,
  now: DateTime<Utc>,
) -> Result<FileLocation> {
  let record = store
    .find_token(token)
    .await?
    .ok_or_else(|| AppError::NotFound("Link unduhan tidak valid.".to_string()))?;

  if record.is_exhausted() {
    return Err(AppError::TokenExhausted);
  }
  if record.is_expired_at(now) {
    return Err(AppError::TokenExpired);
  }

  let storage_settings = storage_settings.ok_or_else(|| AppError::Config("Store belum dikonfigurasi.".to_string()))?;
  let product = store
    .get_product(record.product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Produk tidak ditemukan.".to_string()))?;
  let url = storage::resolve_download_url(storage_settings, &product.file_key, app_base_url).await?;

  let Some(consumed) = store.consume_token(record.id, now).await? else {
    warn!(token_id = %record.id, "Download lost a race for the token's last use.");
    return Err(AppError::TokenExhausted);
  };

  info!(
    token_id = %consumed.id,
    times_downloaded = consumed.times_downloaded,
    max_downloads = consumed.max_downloads,
    "Download redeemed."
  );
  Ok(FileLocation { url, token: consumed })
}
