use crate::errors::{AppError, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Shared outbound HTTP client for gateway calls, with a bounded timeout.
#[derive(Clone, Debug)]
pub struct GatewayClient {
  http: reqwest::Client,
}

impl GatewayClient {
  pub fn new(timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
    Ok(Self { http })
  }

  pub fn http(&self) -> &reqwest::Client {
    &self.http
  }

  /// Sends `request` and parses a JSON body. Non-2xx and unparseable bodies
  /// become `Gateway` errors labelled with `gateway`.
  pub async fn send_json(&self, gateway: &str, request: RequestBuilder) -> Result<Value> {
    let response = request
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("{} request failed: {}", gateway, e)))?;
    let status: StatusCode = response.status();
    let raw = response
      .text()
      .await
      .map_err(|e| AppError::Gateway(format!("{} response unreadable: {}", gateway, e)))?;

    if !status.is_success() {
      tracing::warn!(gateway, status = status.as_u16(), "Gateway returned non-success status.");
      return Err(AppError::Gateway(format!("{} request failed: {} {}", gateway, status.as_u16(), raw)));
    }

    serde_json::from_str(&raw).map_err(|_| AppError::Gateway(format!("Unexpected {} response: {}", gateway, raw)))
  }
}
