mod common;

use common::*;
use digistore_flow::{ContextData, FlowError, FlowRegistry, Pipeline, PipelineControl};

#[derive(Clone, Debug, Default)]
struct CheckoutCtx {
  created: bool,
}

#[derive(Clone, Debug, Default)]
struct SettlementCtx {
  settled: bool,
}

#[tokio::test]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut checkout = Pipeline::<CheckoutCtx, TestError>::new(&[("create", false, None)]);
  checkout.on("create", |ctx: ContextData<CheckoutCtx>| {
    Box::pin(async move {
      ctx.write().created = true;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  registry.register(checkout);

  let mut settlement = Pipeline::<SettlementCtx, TestError>::new(&[("settle", false, None)]);
  settlement.on("settle", |ctx: ContextData<SettlementCtx>| {
    Box::pin(async move {
      ctx.write().settled = true;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  registry.register(settlement);

  assert!(registry.is_registered::<CheckoutCtx>());
  assert!(registry.is_registered::<SettlementCtx>());

  let checkout_ctx = ContextData::new(CheckoutCtx::default());
  assert!(registry.run(checkout_ctx.clone()).await.unwrap().is_clean());
  assert!(checkout_ctx.read().created);

  let settlement_ctx = ContextData::new(SettlementCtx::default());
  registry.run(settlement_ctx.clone()).await.unwrap();
  assert!(settlement_ctx.read().settled);
}

#[tokio::test]
async fn unregistered_context_type_is_an_error() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let err = registry.run(ContextData::new(CheckoutCtx::default())).await.unwrap_err();

  match err {
    TestError::Flow(msg) => {
      assert!(msg.contains("NotRegistered"));
      assert!(msg.contains("CheckoutCtx"));
    }
    other => panic!("expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn handler_errors_surface_through_registry() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  let mut pipeline = Pipeline::<OrderFlowCtx, TestError>::new(&[("charge", false, None)]);
  pipeline.on("charge", failing_handler("charge", "declined"));
  registry.register(pipeline);

  let err = registry.run(ContextData::new(OrderFlowCtx::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("declined".to_string()));
}

#[tokio::test]
async fn default_registry_uses_flow_error() {
  setup_tracing();
  let registry: FlowRegistry = FlowRegistry::default();
  let mut pipeline = Pipeline::<SettlementCtx, FlowError>::new(&[("settle", false, None)]);
  pipeline.on("settle", |ctx: ContextData<SettlementCtx>| {
    Box::pin(async move {
      ctx.write().settled = true;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  registry.register(pipeline);

  let ctx = ContextData::new(SettlementCtx::default());
  registry.run(ctx.clone()).await.unwrap();
  assert!(ctx.read().settled);
}
