//! Outbound email transports.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
  pub from: String,
  pub to: String,
  pub subject: String,
  pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmailInfo {
  pub to: String,
  pub subject: String,
  pub message_id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: &OutgoingEmail) -> Result<SentEmailInfo>;
}

/// Logs the email instead of sending it. Used when no Resend key is set.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, email: &OutgoingEmail) -> Result<SentEmailInfo> {
    let message_id = format!("log_{}", uuid::Uuid::new_v4());
    info!(
      to = %email.to,
      from = %email.from,
      subject = %email.subject,
      message_id = %message_id,
      "Email delivery disabled; logging receipt instead."
    );
    Ok(SentEmailInfo {
      to: email.to.clone(),
      subject: email.subject.clone(),
      message_id,
    })
  }
}

#[derive(Deserialize)]
struct ResendResponse {
  id: Option<String>,
}

/// Sends through the Resend HTTP API.
pub struct ResendMailer {
  http: reqwest::Client,
  api_url: String,
  api_key: String,
}

impl ResendMailer {
  pub fn new(http: reqwest::Client, api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self {
      http,
      api_url: api_url.into().trim_end_matches('/').to_string(),
      api_key: api_key.into(),
    }
  }
}

#[async_trait]
impl Mailer for ResendMailer {
  async fn send(&self, email: &OutgoingEmail) -> Result<SentEmailInfo> {
    let response = self
      .http
      .post(format!("{}/emails", self.api_url))
      .bearer_auth(&self.api_key)
      .json(email)
      .send()
      .await
      .map_err(|e| AppError::Email(format!("Resend request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(AppError::Email(format!("Resend rejected email: {} {}", status.as_u16(), body)));
    }

    let parsed: ResendResponse = response
      .json()
      .await
      .map_err(|e| AppError::Email(format!("Unexpected Resend response: {}", e)))?;
    let message_id = parsed.id.unwrap_or_default();
    info!(to = %email.to, message_id = %message_id, "Email sent via Resend.");

    Ok(SentEmailInfo {
      to: email.to.clone(),
      subject: email.subject.clone(),
      message_id,
    })
  }
}

/// Resend when an API key is configured, otherwise the logging transport.
pub fn mailer_from_config(config: &AppConfig, http: reqwest::Client) -> Arc<dyn Mailer> {
  match config.resend_api_key.as_deref() {
    Some(key) => Arc::new(ResendMailer::new(http, config.resend_api_url.clone(), key)),
    None => Arc::new(LogMailer),
  }
}
