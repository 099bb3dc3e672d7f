//! Resolves a product file key to a URL the customer can fetch.

use crate::errors::{AppError, Result};
use crate::models::StorageSettings;
use s3::creds::Credentials;
use s3::{Bucket, Region};

/// Presigned R2 links stay valid for five minutes.
const PRESIGN_TTL_SECS: u32 = 300;

fn set(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn join(base: &str, key: &str) -> String {
  format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

#[tracing::instrument(name = "storage::resolve", skip(storage, app_base_url))]
pub async fn resolve_download_url(storage: &StorageSettings, file_key: &str, app_base_url: &str) -> Result<String> {
  if file_key.trim().is_empty() {
    return Err(AppError::StorageResolution("Produk tidak memiliki file.".to_string()));
  }

  if set(&storage.provider) == Some("r2") {
    if let Some(public_base) = set(&storage.public_base_url) {
      return Ok(join(public_base, file_key));
    }
    if let (Some(bucket), Some(account_id), Some(access_key), Some(secret_key)) = (
      set(&storage.bucket),
      set(&storage.account_id),
      set(&storage.access_key),
      set(&storage.secret_key),
    ) {
      return presign_r2(bucket, account_id, access_key, secret_key, file_key).await;
    }
    tracing::warn!("R2 storage selected without public URL or credentials, falling back.");
  }

  if let Some(base_url) = set(&storage.base_url) {
    return Ok(join(base_url, file_key));
  }

  Ok(join(&format!("{}/downloads", app_base_url), file_key))
}

async fn presign_r2(bucket: &str, account_id: &str, access_key: &str, secret_key: &str, file_key: &str) -> Result<String> {
  let region = Region::Custom {
    region: "auto".to_string(),
    endpoint: format!("https://{}.r2.cloudflarestorage.com", account_id),
  };
  let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
    .map_err(|e| AppError::StorageResolution(format!("Invalid R2 credentials: {}", e)))?;
  let bucket = Bucket::new(bucket, region, credentials)
    .map_err(|e| AppError::StorageResolution(format!("Failed to open R2 bucket: {}", e)))?
    .with_path_style();

  bucket
    .presign_get(file_key, PRESIGN_TTL_SECS, None)
    .await
    .map_err(|e| AppError::StorageResolution(format!("Failed to presign download: {}", e)))
}
