//! Data carried through each pipeline run. Handlers receive these wrapped in
//! `digistore_flow::ContextData`.

use crate::gateways::PaymentOutcome;
use crate::models::{DownloadToken, Order, OrderStatus, Product, StoreSettings};
use crate::services::orders::{CheckoutRequest, PaymentUpdate};
use crate::state::AppState;
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub request: CheckoutRequest,
  pub now: DateTime<Utc>,
  pub settings: Option<StoreSettings>,
  pub product: Option<Product>,
  pub order: Option<Order>,
  pub outcome: Option<PaymentOutcome>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, request: CheckoutRequest, now: DateTime<Utc>) -> Self {
    Self {
      app_state,
      request,
      now,
      settings: None,
      product: None,
      order: None,
      outcome: None,
    }
  }
}

#[derive(Clone)]
pub struct SettlementCtxData {
  pub app_state: AppState,
  pub update: PaymentUpdate,
  pub now: DateTime<Utc>,
  /// Status before this update; `None` until the order has been loaded.
  pub previous_status: Option<OrderStatus>,
  pub order: Option<Order>,
  pub issued_tokens: Vec<DownloadToken>,
  pub receipt_enqueued: bool,
}

impl SettlementCtxData {
  pub fn new(app_state: AppState, update: PaymentUpdate, now: DateTime<Utc>) -> Self {
    Self {
      app_state,
      update,
      now,
      previous_status: None,
      order: None,
      issued_tokens: Vec::new(),
      receipt_enqueued: false,
    }
  }
}
