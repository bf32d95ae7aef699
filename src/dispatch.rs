//! Notification delivery

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::MonitorConfig;
use crate::types::AlertEvent;

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Somewhere events can be sent
///
/// A send never errors out of the pipeline; failures come back as
/// [`DeliveryOutcome::Failed`] and are already logged.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, event: &AlertEvent) -> DeliveryOutcome;
}

/// Posts events to a webhook endpoint
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
    url: String,
    success_status: StatusCode,
}

impl WebhookDispatcher {
    pub fn new(url: &str, timeout: Duration, success_status: u16) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let success_status = StatusCode::from_u16(success_status)?;

        Ok(Self {
            client,
            url: url.to_string(),
            success_status,
        })
    }

    pub fn from_config(config: &MonitorConfig, url: &str) -> anyhow::Result<Self> {
        Self::new(
            url,
            Duration::from_secs(config.request_timeout_secs),
            config.success_status,
        )
    }

    async fn post(&self, event: &AlertEvent) -> anyhow::Result<()> {
        let response = self.client.post(&self.url).json(event).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if status != self.success_status {
            return Err(anyhow::anyhow!("Webhook returned {} - {}", status, body.trim()));
        }
        if !body.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Webhook returned {} with unexpected body: {}",
                status,
                body.trim()
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookDispatcher {
    async fn send(&self, event: &AlertEvent) -> DeliveryOutcome {
        match self.post(event).await {
            Ok(()) => {
                debug!(title = %event.title, "Webhook event sent successfully");
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                error!(title = %event.title, "Failed to send webhook event: {}", e);
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Sink used when no webhook is configured; events only reach the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, event: &AlertEvent) -> DeliveryOutcome {
        info!(
            title = %event.title,
            fields = event.fields.len(),
            has_image = event.image.is_some(),
            "{}",
            event.description
        );
        DeliveryOutcome::Delivered
    }
}
