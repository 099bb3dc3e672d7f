//! Checkout and settlement pipelines.

use crate::errors::AppError;
use digistore_flow::FlowRegistry;

pub mod checkout_pipeline;
pub mod contexts;
pub mod settlement_pipeline;

/// Registers every pipeline. Called once while building `AppState`.
pub fn register_all_pipelines(registry: &FlowRegistry<AppError>) {
  checkout_pipeline::register_checkout_pipeline(registry);
  settlement_pipeline::register_settlement_pipeline(registry);
  tracing::info!("Storefront pipelines registered.");
}
