//! Duitku invoice creation and callback verification.

use super::{GatewayClient, PaymentAction, PaymentOutcome};
use crate::errors::{AppError, Result};
use crate::models::{DuitkuConfig, Order, OrderStatus};
use chrono::{DateTime, Utc};
use md5::Md5;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

pub const DEFAULT_BASE_URL: &str = "https://sandbox.duitku.com";
const DEFAULT_EXPIRY_MINUTES: u32 = 60;
const DEFAULT_PRODUCT_DETAILS: &str = "Digital Product";

/// `sha256_hex(merchantCode + timestamp + apiKey)` sent as `x-duitku-signature`.
pub fn invoice_signature(merchant_code: &str, timestamp_millis: i64, api_key: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(merchant_code.as_bytes());
  hasher.update(timestamp_millis.to_string().as_bytes());
  hasher.update(api_key.as_bytes());
  hex::encode(hasher.finalize())
}

/// `md5_hex(merchantCode + merchantOrderId + amount + resultCode + apiKey)`.
pub fn callback_signature(merchant_code: &str, order_id: &str, amount: &str, result_code: &str, api_key: &str) -> String {
  let mut hasher = Md5::new();
  for part in [merchant_code, order_id, amount, result_code, api_key] {
    hasher.update(part.as_bytes());
  }
  hex::encode(hasher.finalize())
}

/// Splits a display name into Duitku's first/last name pair. A single-word
/// name is repeated as the last name.
pub fn split_name(name: &str) -> (String, String) {
  let mut words = name.split_whitespace();
  let first = words.next().unwrap_or_default().to_string();
  let rest = words.collect::<Vec<_>>().join(" ");
  let last = if rest.is_empty() { first.clone() } else { rest };
  (first, last)
}

struct Credentials<'a> {
  merchant_code: &'a str,
  api_key: &'a str,
  base_url: String,
}

fn credentials(cfg: &DuitkuConfig) -> Result<Credentials<'_>> {
  let merchant_code = super::non_empty(cfg.merchant_code.as_deref())
    .ok_or_else(|| AppError::Gateway("Duitku merchant code is not configured".to_string()))?;
  let api_key = super::non_empty(cfg.api_key.as_deref())
    .ok_or_else(|| AppError::Gateway("Duitku API key is not configured".to_string()))?;
  let base_url = super::trim_base_url(super::non_empty(cfg.base_url.as_deref()).unwrap_or(DEFAULT_BASE_URL));
  Ok(Credentials {
    merchant_code,
    api_key,
    base_url,
  })
}

/// Builds the createInvoice body. Empty optional fields are dropped at the
/// top level only.
pub fn invoice_payload(cfg: &DuitkuConfig, order: &Order, app_base_url: &str) -> Value {
  let (first_name, last_name) = split_name(&order.customer.name);
  let phone = order.customer.phone.clone().unwrap_or_default();

  let item_details: Vec<Value> = if order.items.is_empty() {
    vec![json!({
      "name": cfg.product_details.as_deref().unwrap_or(DEFAULT_PRODUCT_DETAILS),
      "price": order.total,
      "quantity": 1,
    })]
  } else {
    order
      .items
      .iter()
      .map(|item| json!({ "name": item.title, "price": item.price, "quantity": 1 }))
      .collect()
  };

  let product_details = super::non_empty(cfg.product_details.as_deref())
    .map(str::to_string)
    .or_else(|| order.items.first().map(|item| item.title.clone()))
    .unwrap_or_else(|| DEFAULT_PRODUCT_DETAILS.to_string());

  let address = json!({
    "firstName": first_name,
    "lastName": last_name,
    "address": "-",
    "city": "Jakarta",
    "postalCode": "12345",
    "phone": phone,
    "countryCode": "ID",
  });

  let callback_url = super::non_empty(cfg.callback_url.as_deref())
    .map(str::to_string)
    .unwrap_or_else(|| format!("{}/api/webhooks/duitku", app_base_url));
  let return_url = super::non_empty(cfg.return_url.as_deref())
    .map(str::to_string)
    .unwrap_or_else(|| format!("{}/success?orderNumber={}", app_base_url, order.order_number));

  let payload = json!({
    "paymentAmount": order.total,
    "merchantOrderId": order.order_number,
    "productDetails": product_details,
    "additionalParam": "",
    "merchantUserInfo": "",
    "customerVaName": order.customer.name,
    "email": order.customer.email,
    "phoneNumber": phone,
    "itemDetails": item_details,
    "customerDetail": {
      "firstName": first_name,
      "lastName": last_name,
      "email": order.customer.email,
      "phoneNumber": phone,
      "billingAddress": address,
      "shippingAddress": address,
    },
    "callbackUrl": callback_url,
    "returnUrl": return_url,
    "expiryPeriod": cfg.expiry_period.unwrap_or(DEFAULT_EXPIRY_MINUTES),
    "paymentMethod": cfg.payment_method,
  });

  match payload {
    Value::Object(map) => Value::Object(
      map
        .into_iter()
        .filter(|(_, v)| !matches!(v, Value::Null) && v.as_str() != Some(""))
        .collect::<Map<String, Value>>(),
    ),
    other => other,
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceResponse {
  status_code: Option<String>,
  status_message: Option<String>,
  reference: Option<String>,
  payment_url: Option<String>,
}

/// Creates a Duitku invoice and redirects the customer to its payment page.
#[tracing::instrument(name = "duitku_create_invoice", skip_all, fields(order_number = %order.order_number))]
pub async fn create_invoice(
  client: &GatewayClient,
  cfg: &DuitkuConfig,
  order: &Order,
  app_base_url: &str,
  now: DateTime<Utc>,
) -> Result<PaymentOutcome> {
  let creds = credentials(cfg)?;
  let timestamp = now.timestamp_millis();
  let payload = invoice_payload(cfg, order, app_base_url);

  let request = client
    .http()
    .post(format!("{}/api/merchant/createInvoice", creds.base_url))
    .header("x-duitku-signature", invoice_signature(creds.merchant_code, timestamp, creds.api_key))
    .header("x-duitku-timestamp", timestamp.to_string())
    .header("x-duitku-merchantcode", creds.merchant_code)
    .json(&payload);

  let body = client.send_json("Duitku", request).await?;
  let response: InvoiceResponse = serde_json::from_value(body.clone())
    .map_err(|_| AppError::Gateway(format!("Unexpected Duitku response: {}", body)))?;

  if response.status_code.as_deref() != Some("00") {
    let message = response
      .status_message
      .unwrap_or_else(|| "Duitku rejected the invoice".to_string());
    return Err(AppError::Gateway(message));
  }

  let payment_url = response
    .payment_url
    .ok_or_else(|| AppError::Gateway("Duitku response is missing paymentUrl".to_string()))?;

  tracing::info!(reference = ?response.reference, "Duitku invoice created.");
  Ok(PaymentOutcome {
    action: Some(PaymentAction::Redirect { url: payment_url.clone() }),
    payment_ref: response.reference,
    invoice_meta: Some(payment_url),
  })
}

/// Callback parameters as Duitku posts them. Numeric fields may arrive as
/// JSON numbers and are kept in their textual form for the signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuitkuCallback {
  pub merchant_code: Option<String>,
  pub merchant_order_id: Option<String>,
  pub amount: Option<String>,
  pub reference: Option<String>,
  pub result_code: Option<String>,
  pub status_message: Option<String>,
  pub signature: Option<String>,
}

impl DuitkuCallback {
  pub fn from_json(body: &Value) -> Self {
    let field = |name: &str| super::loose_string(body.get(name)).filter(|v| !v.is_empty());
    Self {
      merchant_code: field("merchantCode"),
      merchant_order_id: field("merchantOrderId"),
      amount: field("amount"),
      reference: field("reference"),
      result_code: field("resultCode"),
      status_message: field("statusMessage"),
      signature: field("signature"),
    }
  }

  pub fn status(&self) -> OrderStatus {
    match self.result_code.as_deref() {
      Some("00") => OrderStatus::Paid,
      Some("01") => OrderStatus::Pending,
      _ => OrderStatus::Failed,
    }
  }
}

/// Checks the callback signature. The merchant code falls back to the
/// configured one when the payload omits it. Returns the order number.
pub fn verify_callback(callback: &DuitkuCallback, cfg: &DuitkuConfig) -> Result<String> {
  let order_number = callback
    .merchant_order_id
    .clone()
    .ok_or_else(|| AppError::Validation("Missing order number".to_string()))?;

  let merchant_code = callback
    .merchant_code
    .as_deref()
    .or_else(|| super::non_empty(cfg.merchant_code.as_deref()));
  let api_key = super::non_empty(cfg.api_key.as_deref());

  let (signature, merchant_code, api_key) = match (callback.signature.as_deref(), merchant_code, api_key) {
    (Some(sig), Some(mc), Some(key)) => (sig, mc, key),
    _ => return Err(AppError::Signature("Missing signature".to_string())),
  };

  let expected = callback_signature(
    merchant_code,
    &order_number,
    callback.amount.as_deref().unwrap_or_default(),
    callback.result_code.as_deref().unwrap_or_default(),
    api_key,
  );

  if expected != signature.to_lowercase() {
    tracing::warn!(order_number = %order_number, "Duitku callback signature mismatch.");
    return Err(AppError::Signature("Invalid signature".to_string()));
  }
  Ok(order_number)
}
