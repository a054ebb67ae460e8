//! Operational alert delivery
//!
//! Alerts are posted as `{"title": ..., "message": ...}` JSON to a chat or
//! incident webhook. Without a configured URL the alert is only logged.

use crate::config::schema::HealthConfig;
use crate::domain::{IntakeError, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One operational alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Destination for operational alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<()>;
}

/// Posts alerts to a webhook
pub struct WebhookAlerter {
    url: Option<String>,
    http_client: reqwest::Client,
}

impl WebhookAlerter {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                IntakeError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { url, http_client })
    }

    pub fn from_config(config: &HealthConfig) -> Result<Self> {
        let url = config
            .alert_webhook_url
            .as_ref()
            .map(|u| u.expose_secret().trim().to_string())
            .filter(|u| !u.is_empty());
        Self::new(url, Duration::from_secs(config.request_timeout_seconds))
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait]
impl AlertSink for WebhookAlerter {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let Some(url) = &self.url else {
            tracing::warn!(
                title = %alert.title,
                message = %alert.message,
                "Alert raised (no webhook configured)"
            );
            return Ok(());
        };

        let response = self
            .http_client
            .post(url)
            .json(alert)
            .send()
            .await
            .map_err(|e| IntakeError::Alert(format!("Failed to send alert: {e}")))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(title = %alert.title, "Alert delivered");
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(IntakeError::Alert(format!(
                "Alert webhook returned status {status}: {body}"
            )))
        }
    }
}
