//! Receipt email: rendering plus a background worker fed by a channel so
//! that a slow or failing mail provider never holds up settlement.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::{DownloadToken, Order, StoreSettings};
use crate::services::mailer::{Mailer, OutgoingEmail, SentEmailInfo};
use crate::store::Store;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptJob {
  pub order_id: Uuid,
}

/// Handle to the receipt worker. Cloning shares the same queue.
#[derive(Clone)]
pub struct ReceiptDispatcher {
  sender: mpsc::UnboundedSender<ReceiptJob>,
}

impl ReceiptDispatcher {
  /// Spawns the worker on the current tokio runtime.
  pub fn spawn(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Arc<AppConfig>) -> Self {
    let (sender, mut receiver) = mpsc::unbounded_channel::<ReceiptJob>();
    tokio::spawn(async move {
      while let Some(job) = receiver.recv().await {
        if let Err(e) = deliver_receipt(store.as_ref(), mailer.as_ref(), &config, job.order_id).await {
          error!(order_id = %job.order_id, error = %e, "Receipt delivery failed.");
        }
      }
      debug!("Receipt queue closed, worker exiting.");
    });
    Self { sender }
  }

  /// Queues a receipt for `order_id`. Never blocks.
  pub fn enqueue(&self, order_id: Uuid) -> Result<()> {
    self
      .sender
      .send(ReceiptJob { order_id })
      .map_err(|_| AppError::Email("Receipt worker is not running".to_string()))
  }
}

pub struct ReceiptLink {
  pub title: String,
  pub url: String,
  pub token: DownloadToken,
}

/// Loads the order, its tokens and the store identity, then sends one email.
/// Returns `None` when there is nothing to send.
#[instrument(name = "receipts::deliver", skip(store, mailer, config))]
pub async fn deliver_receipt(
  store: &dyn Store,
  mailer: &dyn Mailer,
  config: &AppConfig,
  order_id: Uuid,
) -> Result<Option<SentEmailInfo>> {
  let Some(order) = store.find_order(order_id).await? else {
    warn!("Receipt requested for an order that no longer exists.");
    return Ok(None);
  };
  if order.customer.email.trim().is_empty() {
    debug!(order_number = %order.order_number, "Order has no customer email, skipping receipt.");
    return Ok(None);
  }

  let settings = store.load_settings().await?.unwrap_or_default();
  let tokens = store.tokens_for_order(order.id).await?;
  let links = receipt_links(&order, tokens, &config.app_base_url);
  let email = render_receipt(&settings, &config.email_sender, &order, &links);

  let sent = mailer.send(&email).await?;
  info!(order_number = %order.order_number, message_id = %sent.message_id, "Receipt sent.");
  Ok(Some(sent))
}

fn receipt_links(order: &Order, tokens: Vec<DownloadToken>, app_base_url: &str) -> Vec<ReceiptLink> {
  tokens
    .into_iter()
    .map(|token| {
      let title = order
        .items
        .iter()
        .find(|item| item.product_id == token.product_id)
        .map(|item| item.title.clone())
        .unwrap_or_else(|| "Produk digital".to_string());
      ReceiptLink {
        title,
        url: format!("{}/api/download/{}", app_base_url, token.token),
        token,
      }
    })
    .collect()
}

/// `79000` → `Rp 79.000`.
pub fn format_rupiah(amount: i64) -> String {
  let digits = amount.unsigned_abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }
  let sign = if amount < 0 { "-" } else { "" };
  format!("{}Rp {}", sign, grouped)
}

fn escape_html(raw: &str) -> String {
  raw
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

pub fn render_receipt(settings: &StoreSettings, default_sender: &str, order: &Order, links: &[ReceiptLink]) -> OutgoingEmail {
  let store_name = escape_html(&settings.store_name);
  let customer_name = if order.customer.name.trim().is_empty() {
    &order.customer.email
  } else {
    &order.customer.name
  };

  let links_html = links
    .iter()
    .map(|link| {
      format!(
        "<li><p><strong>{}</strong></p><p><a href=\"{}\">Unduh file</a></p><p>Kedaluwarsa: {}</p><p>Sisa kuota unduhan: {}</p></li>",
        escape_html(&link.title),
        link.url,
        link.token.expires_at.format("%d/%m/%Y %H.%M.%S UTC"),
        link.token.remaining(),
      )
    })
    .collect::<Vec<_>>()
    .join("\n");

  let html = format!(
    "<div>\n<h2>{store}</h2>\n<p>Halo {name},</p>\n<p>Terima kasih atas pembelian Anda. Berikut detail pesanan <strong>{number}</strong>.</p>\n<p>Total dibayar: {total}</p>\n<h3>Link Unduhan</h3>\n<ul>{links}</ul>\n<p>Selamat menikmati produk digital Anda!</p>\n</div>",
    store = store_name,
    name = escape_html(customer_name),
    number = order.order_number,
    total = format_rupiah(order.total),
    links = links_html,
  );

  let from = if settings.contact_email.trim().is_empty() {
    default_sender.to_string()
  } else {
    settings.contact_email.clone()
  };

  OutgoingEmail {
    from,
    to: order.customer.email.clone(),
    subject: format!("[{}] Bukti Pembelian {}", settings.store_name, order.order_number),
    html,
  }
}
