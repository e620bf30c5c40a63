//! Outbound alert delivery.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::{CheckResult, StatusText};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Webhook body posted on a status transition.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub url: String,
    pub status: StatusText,
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<u16>,
}

/// Whether a status change warrants an alert: UP/DOWN flips in either
/// direction, plus the first observed UP or DOWN status of a target.
/// Repeated identical statuses never fire.
pub fn should_alert(previous: Option<StatusText>, current: StatusText) -> bool {
    matches!(
        (previous, current),
        (None, StatusText::Up | StatusText::Down)
            | (Some(StatusText::Up), StatusText::Down)
            | (Some(StatusText::Down), StatusText::Up)
    )
}

/// Best-effort webhook dispatcher.
///
/// At most one delivery attempt per transition, bounded by a short timeout;
/// failures are logged and dropped. An unconfigured webhook disables
/// dispatch entirely.
pub struct AlertDispatcher {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl AlertDispatcher {
    pub fn new(webhook_url: Option<String>) -> reqwest::Result<Self> {
        Ok(Self {
            webhook_url,
            client: reqwest::Client::builder()
                .timeout(DELIVERY_TIMEOUT)
                .build()?,
        })
    }

    pub fn enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Deliver one transition notification. No retry.
    pub async fn notify(&self, url: &str, previous: Option<StatusText>, result: &CheckResult) {
        let Some(webhook) = &self.webhook_url else {
            return;
        };

        tracing::info!(
            "Status of {} changed {} -> {}, notifying webhook",
            url,
            previous.map_or_else(|| "(none)".to_string(), |s| s.to_string()),
            result.status_text,
        );

        let payload = AlertPayload {
            url: url.to_string(),
            status: result.status_text,
            timestamp: result.timestamp,
            status_code: result.status_code,
        };

        match self.client.post(webhook).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    "Alert webhook answered {} for {}",
                    response.status(),
                    url
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Alert delivery failed for {}: {}", url, e),
        }
    }
}
