//! Store settings. Each blob is a JSONB column decoded into these types at
//! the store boundary; nothing downstream touches raw JSON.

use crate::config::ProviderFallbacks;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which adapter handles checkout. Unknown names are kept verbatim so that
/// a settings row written by a newer version still loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GatewayKind {
  ManualQris,
  Duitku,
  AutoQris,
  Stripe,
  Midtrans,
  Xendit,
  Other(String),
}

impl GatewayKind {
  pub fn as_str(&self) -> &str {
    match self {
      GatewayKind::ManualQris => "manual-qris",
      GatewayKind::Duitku => "duitku",
      GatewayKind::AutoQris => "auto-qris",
      GatewayKind::Stripe => "stripe",
      GatewayKind::Midtrans => "midtrans",
      GatewayKind::Xendit => "xendit",
      GatewayKind::Other(name) => name,
    }
  }
}

impl From<String> for GatewayKind {
  fn from(value: String) -> Self {
    match value.as_str() {
      "manual-qris" => GatewayKind::ManualQris,
      "duitku" => GatewayKind::Duitku,
      "auto-qris" => GatewayKind::AutoQris,
      "stripe" => GatewayKind::Stripe,
      "midtrans" => GatewayKind::Midtrans,
      "xendit" => GatewayKind::Xendit,
      _ => GatewayKind::Other(value),
    }
  }
}

impl From<GatewayKind> for String {
  fn from(kind: GatewayKind) -> Self {
    kind.as_str().to_string()
  }
}

impl fmt::Display for GatewayKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManualConfig {
  pub instructions: Option<String>,
  pub qr_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuitkuConfig {
  pub merchant_code: Option<String>,
  pub api_key: Option<String>,
  pub base_url: Option<String>,
  pub callback_url: Option<String>,
  pub return_url: Option<String>,
  /// Minutes until the Duitku invoice lapses.
  pub expiry_period: Option<u32>,
  pub payment_method: Option<String>,
  pub product_details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoQrisConfig {
  pub worker_url: Option<String>,
  pub api_key: Option<String>,
  #[serde(alias = "staticQRIS")]
  pub static_qris: Option<String>,
  pub callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentSettings {
  pub active_gateway: GatewayKind,
  pub manual: Option<ManualConfig>,
  pub duitku: Option<DuitkuConfig>,
  pub auto_qris: Option<AutoQrisConfig>,
  /// Redirect target for the stub gateways (Stripe, Midtrans, Xendit).
  pub payment_action_url: Option<String>,
}

impl Default for PaymentSettings {
  fn default() -> Self {
    Self {
      active_gateway: GatewayKind::ManualQris,
      manual: None,
      duitku: None,
      auto_qris: None,
      payment_action_url: None,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
  pub provider: Option<String>,
  pub base_url: Option<String>,
  pub bucket: Option<String>,
  pub access_key: Option<String>,
  pub secret_key: Option<String>,
  pub account_id: Option<String>,
  pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadPolicy {
  pub download_expiry_hours: i64,
  pub max_downloads: i32,
}

impl Default for DownloadPolicy {
  fn default() -> Self {
    Self {
      download_expiry_hours: 72,
      max_downloads: 3,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
  pub store_name: String,
  pub contact_email: String,
  #[serde(default)]
  pub payment: PaymentSettings,
  #[serde(default)]
  pub storage: StorageSettings,
  #[serde(default)]
  pub policy: DownloadPolicy,
}

impl Default for StoreSettings {
  fn default() -> Self {
    Self {
      store_name: "Digital Goods Store".to_string(),
      contact_email: "hello@store.test".to_string(),
      payment: PaymentSettings::default(),
      storage: StorageSettings::default(),
      policy: DownloadPolicy::default(),
    }
  }
}

fn fill(slot: &mut Option<String>, fallback: &Option<String>) {
  let empty = slot.as_deref().map_or(true, |v| v.trim().is_empty());
  if empty {
    if let Some(value) = fallback {
      *slot = Some(value.clone());
    }
  }
}

impl StoreSettings {
  /// Fills credential gaps from environment-provided values.
  pub fn with_fallbacks(mut self, env: &ProviderFallbacks) -> Self {
    let duitku = self.payment.duitku.get_or_insert_with(DuitkuConfig::default);
    fill(&mut duitku.merchant_code, &env.duitku_merchant_code);
    fill(&mut duitku.api_key, &env.duitku_api_key);
    fill(&mut duitku.base_url, &env.duitku_base_url);

    let auto_qris = self.payment.auto_qris.get_or_insert_with(AutoQrisConfig::default);
    fill(&mut auto_qris.worker_url, &env.auto_qris_worker_url);
    fill(&mut auto_qris.api_key, &env.auto_qris_api_key);
    fill(&mut auto_qris.static_qris, &env.auto_qris_static_qris);
    fill(&mut auto_qris.callback_url, &env.auto_qris_callback_url);

    let storage = &mut self.storage;
    fill(&mut storage.provider, &env.storage_provider);
    fill(&mut storage.base_url, &env.storage_base_url);
    fill(&mut storage.bucket, &env.r2_bucket);
    fill(&mut storage.account_id, &env.r2_account_id);
    fill(&mut storage.access_key, &env.r2_access_key_id);
    fill(&mut storage.secret_key, &env.r2_secret_access_key);
    fill(&mut storage.public_base_url, &env.r2_public_base_url);
    self
  }
}
