#![allow(dead_code)]

use digistore_flow::{ContextData, FlowError, Handler, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

/// A miniature order record flowing through test pipelines.
#[derive(Clone, Debug, Default)]
pub struct OrderFlowCtx {
  pub order_number: String,
  pub paid: bool,
  pub tokens_issued: u32,
  pub receipts_sent: u32,
  pub journal: Vec<String>,
  pub stop_at: Option<String>,
}

impl OrderFlowCtx {
  pub fn for_order(order_number: &str) -> Self {
    Self {
      order_number: order_number.to_string(),
      ..Default::default()
    }
  }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Appends `entry` to the journal and honours `stop_at`.
pub fn journaling_handler(entry: &'static str) -> Handler<OrderFlowCtx, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.journal.push(entry.to_string());
      if guard.stop_at.as_deref() == Some(entry) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(entry: &'static str, message: &'static str) -> Handler<OrderFlowCtx, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowCtx>| {
    Box::pin(async move {
      ctx.write().journal.push(entry.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
