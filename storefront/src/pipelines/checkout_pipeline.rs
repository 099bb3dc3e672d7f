use crate::errors::AppError;
use crate::gateways::ActiveGateway;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::orders;
use crate::store::OrderPatch;
use digistore_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{info, warn};

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("checkout context is missing {}", what))
}

pub fn register_checkout_pipeline(registry: &FlowRegistry<AppError>) {
  let no_reference: SkipCondition<CheckoutCtxData> = Arc::new(|ctx: ContextData<CheckoutCtxData>| {
    ctx.with(|data| !data.outcome.as_ref().is_some_and(|o| o.has_reference()))
  });

  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_customer", false, None),
    ("load_product", false, None),
    ("load_settings", false, None),
    ("create_pending_order", false, None),
    ("create_payment_action", false, None),
    ("record_gateway_reference", false, Some(no_reference)),
  ])
  .with_label("checkout");

  p.on("validate_customer", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let customer = ctx.with(|data| data.request.customer.clone());
      let cleaned = orders::validate_customer(customer)?;
      ctx.write().request.customer = cleaned;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("load_product", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, product_id) = ctx.with(|data| (data.app_state.store.clone(), data.request.product_id));
      let product = store
        .get_product(product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
      ctx.write().product = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("load_settings", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let app_state = ctx.with(|data| data.app_state.clone());
      let settings = app_state.require_settings().await?;
      ctx.write().settings = Some(settings);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("create_pending_order", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, product, customer, gateway, now) = {
        let data = ctx.read();
        let product = data.product.clone().ok_or_else(|| missing("product"))?;
        let settings = data.settings.as_ref().ok_or_else(|| missing("settings"))?;
        (
          data.app_state.store.clone(),
          product,
          data.request.customer.clone(),
          settings.payment.active_gateway.clone(),
          data.now,
        )
      };

      let order = orders::insert_pending_order(store.as_ref(), &product, customer, gateway, now).await?;
      info!(order_number = %order.order_number, total = order.total, gateway = %order.payment_gateway, "Pending order created.");
      ctx.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("create_payment_action", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (gateway, client, order, app_base_url, now) = {
        let data = ctx.read();
        let settings = data.settings.as_ref().ok_or_else(|| missing("settings"))?;
        (
          ActiveGateway::from_settings(&settings.payment),
          data.app_state.gateways.clone(),
          data.order.clone().ok_or_else(|| missing("order"))?,
          data.app_state.config.app_base_url.clone(),
          data.now,
        )
      };

      let outcome = gateway
        .create_payment_action(&client, &order, &app_base_url, now)
        .await
        .inspect_err(|e| warn!(order_number = %order.order_number, error = %e, "Gateway refused the order; it stays pending."))?;
      ctx.write().outcome = Some(outcome);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("record_gateway_reference", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, order_number, patch, now) = {
        let data = ctx.read();
        let order = data.order.as_ref().ok_or_else(|| missing("order"))?;
        let outcome = data.outcome.as_ref().ok_or_else(|| missing("payment outcome"))?;
        (
          data.app_state.store.clone(),
          order.order_number.clone(),
          OrderPatch {
            status: None,
            payment_ref: outcome.payment_ref.clone(),
            invoice_url: outcome.invoice_meta.clone(),
          },
          data.now,
        )
      };

      let updated = store
        .update_order(&order_number, &patch, now)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
      ctx.write().order = Some(updated);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register(p);
}
