use crate::errors::Result;
use crate::models::{DownloadPolicy, DownloadToken, Order};
use crate::store::Store;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

/// One fresh token per line item, all sharing the same expiry.
pub fn build_batch(order: &Order, policy: &DownloadPolicy, now: DateTime<Utc>) -> Result<Vec<DownloadToken>> {
  order
    .items
    .iter()
    .map(|item| {
      DownloadToken::issue(
        order.id,
        item.product_id,
        now,
        policy.download_expiry_hours,
        policy.max_downloads,
      )
    })
    .collect()
}

/// Replaces the order's token batch. Earlier tokens stop working immediately.
#[instrument(name = "tokens::issue", skip_all, fields(order_number = %order.order_number))]
pub async fn issue_tokens(
  store: &dyn Store,
  order: &Order,
  policy: &DownloadPolicy,
  now: DateTime<Utc>,
) -> Result<Vec<DownloadToken>> {
  let batch = build_batch(order, policy, now)?;
  store.replace_tokens(order.id, &batch).await?;
  info!(count = batch.len(), "Download tokens issued.");
  Ok(batch)
}
