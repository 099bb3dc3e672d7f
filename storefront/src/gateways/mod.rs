//! Payment gateway adapters.
//!
//! [`ActiveGateway`] is built from the stored payment settings on every
//! checkout and turns a pending order into a [`PaymentAction`] for the client.

pub mod auto_qris;
pub mod client;
pub mod duitku;
pub mod manual;
pub mod redirect;

pub use client::GatewayClient;

use crate::errors::Result;
use crate::models::{AutoQrisConfig, DuitkuConfig, GatewayKind, ManualConfig, Order, PaymentSettings};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Amounts as the worker reports them, kept textual so that matching against
/// detected payments compares exactly what the customer was shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrisAmounts {
  pub original: String,
  pub unique: String,
  pub combined: String,
}

/// What the client should do to pay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentAction {
  Manual {
    instructions: String,
    #[serde(rename = "qrImageUrl")]
    qr_image_url: Option<String>,
  },
  Redirect {
    url: String,
  },
  AutoQris {
    #[serde(rename = "qrString")]
    qr_string: String,
    #[serde(rename = "orderReference")]
    order_reference: String,
    amounts: QrisAmounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
  },
}

/// Result of asking a gateway for a payment action. `payment_ref` and
/// `invoice_meta` are persisted on the order when present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaymentOutcome {
  pub action: Option<PaymentAction>,
  pub payment_ref: Option<String>,
  pub invoice_meta: Option<String>,
}

impl PaymentOutcome {
  pub fn action_only(action: PaymentAction) -> Self {
    Self {
      action: Some(action),
      ..Default::default()
    }
  }

  pub fn has_reference(&self) -> bool {
    self.payment_ref.is_some() || self.invoice_meta.is_some()
  }
}

/// The configured gateway, with its own configuration block.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveGateway {
  Manual(ManualConfig),
  Duitku(DuitkuConfig),
  AutoQris(AutoQrisConfig),
  Redirect {
    kind: GatewayKind,
    payment_action_url: Option<String>,
  },
  Unmapped(String),
}

impl ActiveGateway {
  pub fn from_settings(payment: &PaymentSettings) -> Self {
    match &payment.active_gateway {
      GatewayKind::ManualQris => ActiveGateway::Manual(payment.manual.clone().unwrap_or_default()),
      GatewayKind::Duitku => ActiveGateway::Duitku(payment.duitku.clone().unwrap_or_default()),
      GatewayKind::AutoQris => ActiveGateway::AutoQris(payment.auto_qris.clone().unwrap_or_default()),
      kind @ (GatewayKind::Stripe | GatewayKind::Midtrans | GatewayKind::Xendit) => ActiveGateway::Redirect {
        kind: kind.clone(),
        payment_action_url: payment.payment_action_url.clone(),
      },
      GatewayKind::Other(name) => ActiveGateway::Unmapped(name.clone()),
    }
  }

  pub fn kind(&self) -> GatewayKind {
    match self {
      ActiveGateway::Manual(_) => GatewayKind::ManualQris,
      ActiveGateway::Duitku(_) => GatewayKind::Duitku,
      ActiveGateway::AutoQris(_) => GatewayKind::AutoQris,
      ActiveGateway::Redirect { kind, .. } => kind.clone(),
      ActiveGateway::Unmapped(name) => GatewayKind::Other(name.clone()),
    }
  }

  /// Produces the payment action for `order`. API gateways make one outbound
  /// call; a failure leaves nothing to persist.
  pub async fn create_payment_action(
    &self,
    client: &GatewayClient,
    order: &Order,
    app_base_url: &str,
    now: DateTime<Utc>,
  ) -> Result<PaymentOutcome> {
    match self {
      ActiveGateway::Manual(cfg) => Ok(manual::payment_action(cfg)),
      ActiveGateway::Duitku(cfg) => duitku::create_invoice(client, cfg, order, app_base_url, now).await,
      ActiveGateway::AutoQris(cfg) => auto_qris::generate_for_order(client, cfg, order, app_base_url).await,
      ActiveGateway::Redirect { payment_action_url, .. } => Ok(redirect::payment_action(payment_action_url.as_deref())),
      ActiveGateway::Unmapped(name) => {
        tracing::warn!(gateway = %name, order_number = %order.order_number, "No adapter for configured gateway.");
        Ok(PaymentOutcome::default())
      }
    }
  }
}

/// Non-empty trimmed value, with trailing slashes removed for URLs.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn trim_base_url(url: &str) -> String {
  url.trim().trim_end_matches('/').to_string()
}

/// Reads a JSON field that may arrive as a string or a number.
pub(crate) fn loose_string(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn redirect_gateways_map_from_settings() {
    let payment = PaymentSettings {
      active_gateway: GatewayKind::Midtrans,
      payment_action_url: Some("https://pay.example/checkout".to_string()),
      ..Default::default()
    };
    let gateway = ActiveGateway::from_settings(&payment);
    assert_eq!(gateway.kind(), GatewayKind::Midtrans);
    assert!(matches!(gateway, ActiveGateway::Redirect { .. }));
  }

  #[test]
  fn actions_serialize_with_type_tag() {
    let manual = PaymentAction::Manual {
      instructions: "Scan".to_string(),
      qr_image_url: None,
    };
    assert_eq!(
      serde_json::to_value(&manual).unwrap(),
      json!({ "type": "manual", "instructions": "Scan", "qrImageUrl": null })
    );

    let qris = PaymentAction::AutoQris {
      qr_string: "000201".to_string(),
      order_reference: "REF".to_string(),
      amounts: QrisAmounts {
        original: "79000".to_string(),
        unique: "123".to_string(),
        combined: "79123".to_string(),
      },
      instructions: None,
    };
    let value = serde_json::to_value(&qris).unwrap();
    assert_eq!(value["type"], "auto_qris");
    assert_eq!(value["qrString"], "000201");
    assert_eq!(value["amounts"]["combined"], "79123");
  }

  #[test]
  fn loose_string_accepts_strings_and_numbers() {
    assert_eq!(loose_string(Some(&json!("79123"))).as_deref(), Some("79123"));
    assert_eq!(loose_string(Some(&json!(79123))).as_deref(), Some("79123"));
    assert_eq!(loose_string(Some(&json!(null))), None);
  }
}
