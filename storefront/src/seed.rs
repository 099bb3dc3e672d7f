//! Demo data for a fresh database.

use crate::errors::Result;
use crate::models::{Product, StoreSettings};
use crate::store::Store;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

fn demo_products() -> Vec<Product> {
  let now = Utc::now();
  let product = |slug: &str, title: &str, description: &str, price: i64, sale_price: Option<i64>, file_key: &str| Product {
    id: Uuid::new_v4(),
    slug: slug.to_string(),
    title: title.to_string(),
    description: Some(description.to_string()),
    price,
    sale_price,
    is_active: true,
    file_key: file_key.to_string(),
    created_at: now,
    updated_at: now,
  };

  vec![
    product(
      "ultimate-notion-kit",
      "Ultimate Notion Productivity Kit",
      "Template Notion lengkap untuk manajemen tugas dan habit.",
      99_000,
      Some(79_000),
      "products/notion-kit.zip",
    ),
    product(
      "ai-prompt-bundle",
      "AI Prompt Bundle 200+",
      "Kumpulan prompt siap pakai untuk ChatGPT dan Midjourney.",
      149_000,
      None,
      "products/ai-prompt-bundle.zip",
    ),
    product(
      "brand-identity-pack",
      "Brand Identity Pack",
      "Template Figma + panduan PDF untuk brand identity startup.",
      249_000,
      None,
      "products/brand-identity-pack.zip",
    ),
  ]
}

/// Writes default settings and the demo catalog into empty tables.
/// Returns whether anything was written.
pub async fn seed_defaults(store: &dyn Store) -> Result<bool> {
  let mut wrote = false;

  if store.load_settings().await?.is_none() {
    store.save_settings(&StoreSettings::default()).await?;
    info!("Seeded default store settings.");
    wrote = true;
  }

  if store.list_products(false).await?.is_empty() {
    let products = demo_products();
    for product in &products {
      store.upsert_product(product).await?;
    }
    info!(count = products.len(), "Seeded demo products.");
    wrote = true;
  }

  Ok(wrote)
}
