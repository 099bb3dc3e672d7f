use crate::errors::AppError;
use crate::models::OrderStatus;
use crate::pipelines::contexts::SettlementCtxData;
use crate::services::tokens;
use crate::store::OrderPatch;
use digistore_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::info;

fn unless_paid() -> SkipCondition<SettlementCtxData> {
  Arc::new(|ctx: ContextData<SettlementCtxData>| ctx.with(|data| data.update.status != OrderStatus::Paid))
}

/// A repeated `paid` reissues tokens but does not mail the receipt again.
fn unless_newly_paid() -> SkipCondition<SettlementCtxData> {
  Arc::new(|ctx: ContextData<SettlementCtxData>| {
    ctx.with(|data| data.update.status != OrderStatus::Paid || data.previous_status == Some(OrderStatus::Paid))
  })
}

fn settled_order(ctx: &ContextData<SettlementCtxData>) -> Result<crate::models::Order, AppError> {
  ctx
    .with(|data| data.order.clone())
    .ok_or_else(|| AppError::Internal("settlement context is missing the order".to_string()))
}

/// Loads the order, issues a fresh token batch on `paid`, then writes the
/// status and, the first time an order becomes paid, queues a receipt.
/// Tokens land before the status so a failed batch leaves the order in its
/// previous state and a retry still counts as newly paid. Receipt queueing is
/// optional: its failure never fails the settlement.
pub fn register_settlement_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<SettlementCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("issue_download_tokens", false, Some(unless_paid())),
    ("apply_status_update", false, None),
    ("enqueue_receipt", true, Some(unless_newly_paid())),
  ])
  .with_label("settlement");

  p.on("load_order", |ctx: ContextData<SettlementCtxData>| {
    Box::pin(async move {
      let (store, order_number) = ctx.with(|data| (data.app_state.store.clone(), data.update.order_number.clone()));
      let order = store
        .find_order_by_number(&order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_number)))?;
      let mut data = ctx.write();
      data.previous_status = Some(order.status);
      data.order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("issue_download_tokens", |ctx: ContextData<SettlementCtxData>| {
    Box::pin(async move {
      let order = settled_order(&ctx)?;
      let (app_state, now) = ctx.with(|data| (data.app_state.clone(), data.now));
      let policy = app_state.settings_or_default().await?.policy;

      let issued = tokens::issue_tokens(app_state.store.as_ref(), &order, &policy, now).await?;
      ctx.write().issued_tokens = issued;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("apply_status_update", |ctx: ContextData<SettlementCtxData>| {
    Box::pin(async move {
      let (store, update, now) = ctx.with(|data| (data.app_state.store.clone(), data.update.clone(), data.now));
      let patch = OrderPatch {
        status: Some(update.status),
        payment_ref: update.payment_ref,
        invoice_url: update.invoice_url,
      };

      let order = store
        .update_order(&update.order_number, &patch, now)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", update.order_number)))?;
      info!(order_number = %order.order_number, status = %order.status, "Order status applied.");
      ctx.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("enqueue_receipt", |ctx: ContextData<SettlementCtxData>| {
    Box::pin(async move {
      let order = settled_order(&ctx)?;
      let receipts = ctx.with(|data| data.app_state.receipts.clone());
      receipts.enqueue(order.id)?;
      ctx.write().receipt_enqueued = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register(p);
}
