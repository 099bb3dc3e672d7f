//! Order lifecycle: checkout, payment settlement and staff edits.

use crate::errors::{AppError, Result};
use crate::gateways::PaymentAction;
use crate::models::order::generate_order_number;
use crate::models::{CustomerSnapshot, GatewayKind, Order, OrderItem, OrderStatus, Product};
use crate::pipelines::contexts::{CheckoutCtxData, SettlementCtxData};
use crate::state::AppState;
use crate::store::{OrderPatch, Store};
use crate::webhooks::PaymentNotice;
use chrono::{DateTime, Utc};
use digistore_flow::ContextData;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Attempts at finding a free order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
  pub product_id: Uuid,
  pub customer: CustomerSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
  pub order_id: Uuid,
  pub order_number: String,
  pub payment_gateway: GatewayKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_action: Option<PaymentAction>,
}

/// A status change requested by a gateway, a reconciliation poll or staff.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
  pub order_number: String,
  pub status: OrderStatus,
  pub payment_ref: Option<String>,
  pub invoice_url: Option<String>,
}

impl From<PaymentNotice> for PaymentUpdate {
  fn from(notice: PaymentNotice) -> Self {
    Self {
      order_number: notice.order_number,
      status: notice.status,
      payment_ref: notice.payment_ref,
      invoice_url: notice.invoice_url,
    }
  }
}

/// Trims the snapshot and checks name and email. A blank phone is dropped.
pub fn validate_customer(customer: CustomerSnapshot) -> Result<CustomerSnapshot> {
  let name = customer.name.trim().to_string();
  let email = customer.email.trim().to_string();
  if name.is_empty() {
    return Err(AppError::Validation("Customer name is required".to_string()));
  }
  if !validator::validate_email(&email) {
    return Err(AppError::Validation("Customer email is invalid".to_string()));
  }
  let phone = customer.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
  Ok(CustomerSnapshot { name, email, phone })
}

/// Persists a single-item `pending` order priced at the product's effective
/// price, retrying with a fresh number if the store reports a collision.
pub async fn insert_pending_order(
  store: &dyn Store,
  product: &Product,
  customer: CustomerSnapshot,
  gateway: GatewayKind,
  now: DateTime<Utc>,
) -> Result<Order> {
  let items = vec![OrderItem {
    product_id: product.id,
    title: product.title.clone(),
    price: product.effective_price(),
  }];

  let mut last_conflict = None;
  for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
    let order = Order::new_pending(
      generate_order_number(now),
      items.clone(),
      customer.clone(),
      gateway.clone(),
      now,
    );
    match store.insert_order(&order).await {
      Ok(()) => return Ok(order),
      Err(AppError::Conflict(msg)) => {
        warn!(attempt, order_number = %order.order_number, "Order number collision, retrying.");
        last_conflict = Some(msg);
      }
      Err(e) => return Err(e),
    }
  }
  Err(AppError::Conflict(
    last_conflict.unwrap_or_else(|| "Could not allocate an order number".to_string()),
  ))
}

/// Runs the checkout pipeline: a `pending` order plus the gateway's payment action.
#[instrument(name = "orders::checkout", skip(app_state, request), fields(product_id = %request.product_id))]
pub async fn checkout(app_state: &AppState, request: CheckoutRequest, now: DateTime<Utc>) -> Result<CheckoutResponse> {
  let ctx = ContextData::new(CheckoutCtxData::new(app_state.clone(), request, now));
  app_state.flows.run(ctx.clone()).await?;

  let data = ctx.read();
  let order = data
    .order
    .as_ref()
    .ok_or_else(|| AppError::Internal("checkout finished without an order".to_string()))?;
  Ok(CheckoutResponse {
    order_id: order.id,
    order_number: order.order_number.clone(),
    payment_gateway: order.payment_gateway.clone(),
    payment_action: data.outcome.as_ref().and_then(|o| o.action.clone()),
  })
}

/// Applies `update` through the settlement pipeline and returns the stored order.
#[instrument(name = "orders::apply_payment_update", skip(app_state), fields(order_number = %update.order_number, status = %update.status))]
pub async fn apply_payment_update(app_state: &AppState, update: PaymentUpdate, now: DateTime<Utc>) -> Result<Order> {
  run_settlement(app_state, update, now).await.map(|(order, _)| order)
}

/// The settled order and whether a receipt was queued along the way.
async fn run_settlement(app_state: &AppState, update: PaymentUpdate, now: DateTime<Utc>) -> Result<(Order, bool)> {
  let ctx = ContextData::new(SettlementCtxData::new(app_state.clone(), update, now));
  let report = app_state.flows.run(ctx.clone()).await?;
  for step in &report.degraded {
    warn!(step = %step.step_name, error = %step.error, "Settlement side effect failed.");
  }

  let (order, receipt_enqueued) = ctx.with(|data| (data.order.clone(), data.receipt_enqueued));
  let order = order.ok_or_else(|| AppError::Internal("settlement finished without an order".to_string()))?;
  Ok((order, receipt_enqueued))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdminOrderUpdate {
  pub status: Option<OrderStatus>,
  pub payment_ref: Option<String>,
  pub invoice_url: Option<String>,
  pub resend_email: Option<bool>,
}

impl AdminOrderUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(url) = &self.invoice_url {
      reqwest::Url::parse(url).map_err(|_| AppError::Validation("Invalid payload".to_string()))?;
    }
    Ok(())
  }
}

/// Staff edit. A status runs the full settlement (so `paid` reissues tokens
/// and queues a receipt); reference-only edits are written without side
/// effects. `resendEmail` queues a receipt unless the settlement just did.
#[instrument(name = "orders::admin_update", skip(app_state, edit))]
pub async fn admin_update_order(app_state: &AppState, id: Uuid, edit: AdminOrderUpdate, now: DateTime<Utc>) -> Result<Order> {
  edit.validate()?;
  let order = app_state
    .store
    .find_order(id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  let receipt_queued = if let Some(status) = edit.status {
    let update = PaymentUpdate {
      order_number: order.order_number.clone(),
      status,
      payment_ref: edit.payment_ref.clone(),
      invoice_url: edit.invoice_url.clone(),
    };
    run_settlement(app_state, update, now).await?.1
  } else {
    let patch = OrderPatch {
      status: None,
      payment_ref: edit.payment_ref.clone(),
      invoice_url: edit.invoice_url.clone(),
    };
    if !patch.is_empty() {
      app_state.store.update_order(&order.order_number, &patch, now).await?;
    }
    false
  };

  if edit.resend_email == Some(true) && !receipt_queued {
    match app_state.receipts.enqueue(order.id) {
      Ok(()) => info!(order_number = %order.order_number, "Receipt re-send queued."),
      Err(e) => warn!(order_number = %order.order_number, error = %e, "Failed to queue receipt re-send."),
    }
  }

  app_state
    .store
    .find_order(id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}
