//! Webhook delivery of audit store alerts
//!
//! Each alert is POSTed once as JSON. Delivery errors are logged and dropped.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use super::alert::{AuditAlertEvent, AuditAlertHook};
use super::config::WebhookConfig;

/// Hook that POSTs alerts to an HTTP endpoint
pub struct WebhookAlertHook {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
}

impl WebhookAlertHook {
    /// Create a hook for `url`
    pub fn new(url: String, timeout: Duration, headers: HashMap<String, String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url,
            headers,
        }
    }

    /// Create a hook from its `[[audit.alerts.webhooks]]` entry
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            config.headers.clone(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AuditAlertHook for WebhookAlertHook {
    async fn on_alert(&self, event: AuditAlertEvent) {
        let request = self
            .headers
            .iter()
            .fold(self.client.post(&self.url).json(&event), |req, (k, v)| {
                req.header(k.as_str(), v.as_str())
            });

        match request.send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    url = %self.url,
                    status = %response.status(),
                    "Audit alert webhook rejected delivery"
                );
            }
            Ok(_) => {
                tracing::debug!(url = %self.url, "Audit alert delivered");
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Audit alert webhook unreachable");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = WebhookConfig {
            url: "https://ops.example/hook".to_string(),
            timeout_secs: 2,
            headers: HashMap::from([("Authorization".to_string(), "Bearer x".to_string())]),
        };
        let hook = WebhookAlertHook::from_config(&config);
        assert_eq!(hook.url(), "https://ops.example/hook");
        assert_eq!(hook.headers.len(), 1);
    }
}
