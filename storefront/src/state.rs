use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::gateways::GatewayClient;
use crate::models::StoreSettings;
use crate::pipelines;
use crate::services::mailer::Mailer;
use crate::services::receipts::ReceiptDispatcher;
use crate::store::Store;
use digistore_flow::FlowRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
  pub gateways: GatewayClient,
  pub receipts: ReceiptDispatcher,
}

impl AppState {
  /// Wires the store, spawns the receipt worker and registers every pipeline.
  /// Must be called from within a tokio runtime.
  pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>, mailer: Arc<dyn Mailer>) -> Result<Self> {
    let gateways = GatewayClient::new(config.gateway_timeout)?;
    let receipts = ReceiptDispatcher::spawn(store.clone(), mailer, config.clone());
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);

    Ok(Self {
      store,
      flows,
      config,
      gateways,
      receipts,
    })
  }

  /// Latest settings with environment credentials filled in.
  pub async fn settings(&self) -> Result<Option<StoreSettings>> {
    let settings = self.store.load_settings().await?;
    Ok(settings.map(|s| s.with_fallbacks(&self.config.fallbacks)))
  }

  /// As [`settings`](Self::settings), falling back to defaults when no row exists.
  pub async fn settings_or_default(&self) -> Result<StoreSettings> {
    let settings = self.store.load_settings().await?.unwrap_or_default();
    Ok(settings.with_fallbacks(&self.config.fallbacks))
  }

  pub async fn require_settings(&self) -> Result<StoreSettings> {
    self
      .settings()
      .await?
      .ok_or_else(|| AppError::Config("Store not configured".to_string()))
  }
}
