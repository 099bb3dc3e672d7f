//! Auto-QRIS worker: dynamic QR generation and payment reconciliation by
//! polling the worker's recent notifications.
//!
//! Matching is by amount only. Two open orders sharing a combined amount
//! within the polled window cannot be told apart; the worker's unique-amount
//! suffix is what keeps that rare.

use super::{GatewayClient, PaymentAction, PaymentOutcome, QrisAmounts};
use crate::errors::{AppError, Result};
use crate::models::{AutoQrisConfig, Order};
use serde_json::{json, Value};

const NOTIFICATION_WINDOW: usize = 10;

struct Worker<'a> {
  url: String,
  api_key: &'a str,
}

fn worker(cfg: &AutoQrisConfig) -> Result<Worker<'_>> {
  let url = super::non_empty(cfg.worker_url.as_deref())
    .map(super::trim_base_url)
    .ok_or_else(|| AppError::Gateway("Auto QRIS worker URL is missing".to_string()))?;
  let api_key = super::non_empty(cfg.api_key.as_deref())
    .ok_or_else(|| AppError::Gateway("Auto QRIS API key is missing".to_string()))?;
  Ok(Worker { url, api_key })
}

pub fn callback_url(cfg: &AutoQrisConfig, app_base_url: &str) -> String {
  let url = super::non_empty(cfg.callback_url.as_deref())
    .map(str::to_string)
    .unwrap_or_else(|| format!("{}/api/webhooks/auto-qris", app_base_url));
  super::trim_base_url(&url)
}

/// JSON stored in the order's `invoice_url` so later verification knows
/// which amount to look for.
pub fn amounts_meta(amounts: &QrisAmounts) -> String {
  json!({
    "combinedAmount": amounts.combined,
    "uniqueAmount": amounts.unique,
    "originalAmount": amounts.original,
  })
  .to_string()
}

fn parse_generation(body: &Value, order: &Order) -> Result<PaymentOutcome> {
  if body.get("success").and_then(Value::as_bool) != Some(true) {
    let message = super::loose_string(body.get("message")).unwrap_or_else(|| "Auto QRIS request failed".to_string());
    return Err(AppError::Gateway(message));
  }

  let qr_string = super::loose_string(body.get("dynamic_qris"))
    .filter(|qr| !qr.is_empty())
    .ok_or_else(|| AppError::Gateway(format!("Unexpected Auto QRIS response: {}", body)))?;
  let total = order.total.to_string();
  let amounts = QrisAmounts {
    original: super::loose_string(body.get("original_amount")).unwrap_or_else(|| total.clone()),
    unique: super::loose_string(body.get("unique_amount")).unwrap_or_else(|| "0".to_string()),
    combined: super::loose_string(body.get("combined_amount"))
      .or_else(|| super::loose_string(body.get("amount_for_payment")))
      .unwrap_or(total),
  };
  let order_reference =
    super::loose_string(body.get("order_reference")).unwrap_or_else(|| order.order_number.clone());
  let instructions = body
    .get("instructions")
    .and_then(|i| i.get("customer"))
    .and_then(Value::as_str)
    .map(str::to_string);

  Ok(PaymentOutcome {
    invoice_meta: Some(amounts_meta(&amounts)),
    payment_ref: Some(order_reference.clone()),
    action: Some(PaymentAction::AutoQris {
      qr_string,
      order_reference,
      amounts,
      instructions,
    }),
  })
}

/// Asks the worker for a dynamic QR bound to `order`.
#[tracing::instrument(name = "auto_qris_generate", skip_all, fields(order_number = %order.order_number))]
pub async fn generate_for_order(
  client: &GatewayClient,
  cfg: &AutoQrisConfig,
  order: &Order,
  app_base_url: &str,
) -> Result<PaymentOutcome> {
  let worker = worker(cfg)?;
  let static_qris = super::non_empty(cfg.static_qris.as_deref())
    .ok_or_else(|| AppError::Gateway("Auto QRIS static QRIS code is missing".to_string()))?;

  let request = client
    .http()
    .post(format!("{}/qris/generate-for-order", worker.url))
    .header("x-api-key", worker.api_key)
    .json(&json!({
      "staticQRIS": static_qris,
      "originalAmount": order.total.to_string(),
      "orderRef": order.order_number,
      "callbackUrl": callback_url(cfg, app_base_url),
    }));

  let body = client.send_json("Auto QRIS", request).await?;
  let outcome = parse_generation(&body, order)?;
  tracing::info!(payment_ref = ?outcome.payment_ref, "Auto QRIS code generated.");
  Ok(outcome)
}

fn strip_leading_zeros(value: &str) -> &str {
  value.trim_start_matches('0')
}

/// The `combinedAmount` recorded by [`amounts_meta`], if the metadata holds one.
pub fn stored_combined_amount(invoice_meta: Option<&str>) -> Option<String> {
  let meta: Value = serde_json::from_str(invoice_meta?).ok()?;
  super::loose_string(meta.get("combinedAmount")).filter(|amount| !strip_leading_zeros(amount).is_empty())
}

/// Amount equality as the worker reports it: leading zeros are ignored.
pub fn same_amount(a: &str, b: &str) -> bool {
  let (a, b) = (strip_leading_zeros(a.trim()), strip_leading_zeros(b.trim()));
  !a.is_empty() && a == b
}

/// True if any detected amount equals `combined_amount`, ignoring leading zeros.
pub fn notifications_match(body: &Value, combined_amount: &str) -> bool {
  let Some(entries) = body.get("data").and_then(Value::as_array) else {
    return false;
  };
  entries.iter().any(|entry| {
    let detected = super::loose_string(entry.get("amount_detected")).unwrap_or_default();
    same_amount(&detected, combined_amount)
  })
}

/// Polls the worker's latest notifications for a payment of `combined_amount`.
#[tracing::instrument(name = "auto_qris_check", skip(client, cfg))]
pub async fn check_payment(client: &GatewayClient, cfg: &AutoQrisConfig, combined_amount: &str) -> Result<bool> {
  let worker = worker(cfg)?;
  let request = client
    .http()
    .get(format!("{}/notifications", worker.url))
    .query(&[("limit", NOTIFICATION_WINDOW)])
    .header("X-API-Key", worker.api_key);

  let body = client.send_json("Auto QRIS", request).await?;
  Ok(notifications_match(&body, combined_amount))
}
