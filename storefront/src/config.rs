use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Credentials read from the environment and used when the stored settings
/// leave a gateway or storage field empty.
#[derive(Debug, Clone, Default)]
pub struct ProviderFallbacks {
  pub duitku_merchant_code: Option<String>,
  pub duitku_api_key: Option<String>,
  pub duitku_base_url: Option<String>,
  pub auto_qris_worker_url: Option<String>,
  pub auto_qris_api_key: Option<String>,
  pub auto_qris_static_qris: Option<String>,
  pub auto_qris_callback_url: Option<String>,
  pub storage_provider: Option<String>,
  pub storage_base_url: Option<String>,
  pub r2_bucket: Option<String>,
  pub r2_account_id: Option<String>,
  pub r2_access_key_id: Option<String>,
  pub r2_secret_access_key: Option<String>,
  pub r2_public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,

  /// Argon2 PHC string of the staff bearer token. `None` locks the admin API.
  pub admin_token_hash: Option<String>,

  pub email_sender: String,
  pub resend_api_key: Option<String>,
  pub resend_api_url: String,

  pub gateway_timeout: Duration,
  pub fallbacks: ProviderFallbacks,

  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let optional_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL")
      .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();

    let gateway_timeout_secs = get_env("GATEWAY_TIMEOUT_SECS")
      .unwrap_or_else(|_| "15".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid GATEWAY_TIMEOUT_SECS: {}", e)))?;

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    let fallbacks = ProviderFallbacks {
      duitku_merchant_code: optional_env("DUITKU_MERCHANT_CODE"),
      duitku_api_key: optional_env("DUITKU_API_KEY"),
      duitku_base_url: optional_env("DUITKU_BASE_URL"),
      auto_qris_worker_url: optional_env("AUTOQRIS_WORKER_URL"),
      auto_qris_api_key: optional_env("AUTOQRIS_API_KEY"),
      auto_qris_static_qris: optional_env("AUTOQRIS_STATIC_QRIS"),
      auto_qris_callback_url: optional_env("AUTOQRIS_CALLBACK_URL"),
      storage_provider: optional_env("STORAGE_PROVIDER"),
      storage_base_url: optional_env("STORAGE_BASE_URL"),
      r2_bucket: optional_env("R2_BUCKET"),
      r2_account_id: optional_env("R2_ACCOUNT_ID"),
      r2_access_key_id: optional_env("R2_ACCESS_KEY_ID"),
      r2_secret_access_key: optional_env("R2_SECRET_ACCESS_KEY"),
      r2_public_base_url: optional_env("R2_PUBLIC_BASE_URL"),
    };

    tracing::info!(
      server_host = %server_host,
      server_port,
      admin_api_enabled = optional_env("ADMIN_TOKEN_HASH").is_some(),
      resend_enabled = optional_env("RESEND_API_KEY").is_some(),
      "Application configuration loaded."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      admin_token_hash: optional_env("ADMIN_TOKEN_HASH"),
      email_sender: get_env("EMAIL_SENDER").unwrap_or_else(|_| "onboarding@example.com".to_string()),
      resend_api_key: optional_env("RESEND_API_KEY"),
      resend_api_url: get_env("RESEND_API_URL").unwrap_or_else(|_| "https://api.resend.com".to_string()),
      gateway_timeout: Duration::from_secs(gateway_timeout_secs),
      fallbacks,
      seed_db,
    })
  }

  /// Configuration for tests and embedded use: no database URL, no secrets.
  pub fn for_base_url(app_base_url: &str) -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: String::new(),
      app_base_url: app_base_url.trim_end_matches('/').to_string(),
      admin_token_hash: None,
      email_sender: "onboarding@example.com".to_string(),
      resend_api_key: None,
      resend_api_url: "https://api.resend.com".to_string(),
      gateway_timeout: Duration::from_secs(5),
      fallbacks: ProviderFallbacks::default(),
      seed_db: false,
    }
  }
}
