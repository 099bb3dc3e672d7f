//! Normalizes redirect-gateway callbacks into a [`PaymentNotice`].
//!
//! These gateways carry no signature check; the notice is trusted as-is and
//! handed to the settlement pipeline.

use crate::errors::{AppError, Result};
use crate::models::OrderStatus;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookSource {
  Stripe,
  Midtrans,
  Xendit,
}

impl WebhookSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      WebhookSource::Stripe => "stripe",
      WebhookSource::Midtrans => "midtrans",
      WebhookSource::Xendit => "xendit",
    }
  }
}

impl fmt::Display for WebhookSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for WebhookSource {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "stripe" => Ok(WebhookSource::Stripe),
      "midtrans" => Ok(WebhookSource::Midtrans),
      "xendit" => Ok(WebhookSource::Xendit),
      other => Err(AppError::NotFound(format!("Unknown webhook source '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotice {
  pub order_number: String,
  pub status: OrderStatus,
  pub payment_ref: Option<String>,
  pub invoice_url: Option<String>,
}

/// Fields pulled out of a payload before validation. `status` is still raw.
struct Extracted {
  order_number: Option<String>,
  status: Option<String>,
  payment_ref: Option<String>,
  invoice_url: Option<String>,
}

fn text(value: &Value, pointer: &str) -> Option<String> {
  value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn first(value: &Value, pointers: &[&str]) -> Option<String> {
  pointers.iter().find_map(|p| text(value, p))
}

fn stripe(payload: &Value) -> Extracted {
  Extracted {
    order_number: first(payload, &["/data/object/metadata/orderNumber", "/orderNumber"]),
    status: text(payload, "/status"),
    payment_ref: first(payload, &["/data/object/payment_intent", "/paymentRef"]),
    invoice_url: first(payload, &["/data/object/invoice/hosted_invoice_url", "/invoiceUrl"]),
  }
}

fn midtrans(payload: &Value) -> Extracted {
  let status = match text(payload, "/transaction_status").as_deref() {
    Some("capture" | "settlement") => "paid",
    Some("pending") => "pending",
    Some("cancel" | "deny" | "expire") => "failed",
    _ => "paid",
  };
  Extracted {
    order_number: first(payload, &["/order_id", "/orderNumber"]),
    status: Some(status.to_string()),
    payment_ref: first(payload, &["/transaction_id", "/paymentRef"]),
    invoice_url: first(payload, &["/pdf_url", "/invoiceUrl"]),
  }
}

fn xendit(payload: &Value) -> Extracted {
  let raw = first(payload, &["/data/status", "/status"])
    .unwrap_or_else(|| "paid".to_string())
    .to_lowercase();
  let status = match raw.as_str() {
    "paid" | "settled" => "paid",
    "voided" | "expired" | "failed" => "failed",
    "pending" => "pending",
    _ => "paid",
  };
  Extracted {
    order_number: first(payload, &["/data/external_id", "/orderNumber"]),
    status: Some(status.to_string()),
    payment_ref: first(payload, &["/data/id", "/paymentRef"]),
    invoice_url: first(payload, &["/data/invoice_url", "/invoiceUrl"]),
  }
}

fn invalid() -> AppError {
  AppError::Validation("Invalid payload".to_string())
}

/// Parses `raw_body` and maps it to a notice. Unparseable bodies are treated
/// as `{}`, which then fails for lack of an order number.
pub fn normalize_webhook(source: WebhookSource, raw_body: &[u8]) -> Result<PaymentNotice> {
  let payload: Value = serde_json::from_slice(raw_body).unwrap_or_else(|_| Value::Object(Default::default()));

  let extracted = match source {
    WebhookSource::Stripe => stripe(&payload),
    WebhookSource::Midtrans => midtrans(&payload),
    WebhookSource::Xendit => xendit(&payload),
  };

  let order_number = extracted.order_number.filter(|n| !n.is_empty()).ok_or_else(invalid)?;
  let status = match extracted.status.as_deref().unwrap_or("paid") {
    "paid" => OrderStatus::Paid,
    "pending" => OrderStatus::Pending,
    "failed" => OrderStatus::Failed,
    _ => return Err(invalid()),
  };

  Ok(PaymentNotice {
    order_number,
    status,
    payment_ref: extracted.payment_ref,
    invoice_url: extracted.invoice_url,
  })
}
