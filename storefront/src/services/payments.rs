//! Inbound payment signals: gateway callbacks and Auto-QRIS reconciliation.

use crate::errors::{AppError, Result};
use crate::gateways::auto_qris;
use crate::gateways::duitku::{self, DuitkuCallback};
use crate::models::{Order, OrderStatus};
use crate::services::orders::{self, PaymentUpdate};
use crate::state::AppState;
use crate::webhooks::{normalize_webhook, WebhookSource};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, instrument, warn};

/// Verifies a Duitku callback and settles the order. Returns Duitku's status message.
#[instrument(name = "payments::duitku_callback", skip_all)]
pub async fn handle_duitku_callback(app_state: &AppState, raw_body: &[u8], now: DateTime<Utc>) -> Result<Option<String>> {
  let body: Value = serde_json::from_slice(raw_body).unwrap_or_else(|_| Value::Object(Default::default()));
  let callback = DuitkuCallback::from_json(&body);

  let settings = app_state.settings_or_default().await?;
  let config = settings.payment.duitku.unwrap_or_default();
  let order_number = duitku::verify_callback(&callback, &config)?;

  let update = PaymentUpdate {
    order_number,
    status: callback.status(),
    payment_ref: callback.reference.clone(),
    invoice_url: None,
  };
  orders::apply_payment_update(app_state, update, now).await?;
  Ok(callback.status_message)
}

/// Stripe, Midtrans and Xendit callbacks.
#[instrument(name = "payments::redirect_webhook", skip(app_state, raw_body))]
pub async fn handle_redirect_webhook(
  app_state: &AppState,
  source: WebhookSource,
  raw_body: &[u8],
  now: DateTime<Utc>,
) -> Result<Order> {
  let notice = normalize_webhook(source, raw_body)?;
  orders::apply_payment_update(app_state, notice.into(), now).await
}

/// Asks the Auto-QRIS worker whether the order's combined amount has arrived
/// and, if so, marks the order paid. Existing references are kept.
///
/// `combined_amount` must be the amount recorded for the order at checkout;
/// the worker is polled with the stored value. An order that is already paid
/// answers `true` without touching its tokens.
#[instrument(name = "payments::verify_auto_qris", skip(app_state))]
pub async fn verify_auto_qris(
  app_state: &AppState,
  order_number: &str,
  combined_amount: &str,
  now: DateTime<Utc>,
) -> Result<bool> {
  if order_number.trim().is_empty() || combined_amount.trim().is_empty() {
    return Err(AppError::Validation("Invalid payload".to_string()));
  }

  let order = app_state
    .store
    .find_order_by_number(order_number)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  if order.status == OrderStatus::Paid {
    return Ok(true);
  }

  let expected = auto_qris::stored_combined_amount(order.invoice_url.as_deref())
    .ok_or_else(|| AppError::Validation("Order has no Auto QRIS amount".to_string()))?;
  if !auto_qris::same_amount(&expected, combined_amount) {
    warn!(order_number = %order.order_number, "Auto QRIS verify amount does not match the order.");
    return Err(AppError::Validation("Amount does not match order".to_string()));
  }

  let settings = app_state.require_settings().await?;
  let config = settings.payment.auto_qris.unwrap_or_default();

  if !auto_qris::check_payment(&app_state.gateways, &config, &expected).await? {
    return Ok(false);
  }

  info!(order_number = %order.order_number, "Auto QRIS payment detected.");
  let update = PaymentUpdate {
    order_number: order.order_number,
    status: OrderStatus::Paid,
    payment_ref: None,
    invoice_url: None,
  };
  orders::apply_payment_update(app_state, update, now).await?;
  Ok(true)
}
