//! Audit trail configuration
//!
//! Loaded from the `[audit]` section of config.toml or `CIVIC_AUDIT__*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the writer hands records to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// The triggering save waits until the append has committed
    #[default]
    Inline,
    /// Records are queued to a sequential worker task
    Background,
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Dispatch mode for appends (default: inline)
    #[serde(default)]
    pub dispatch: DispatchMode,

    /// Records the background queue holds before new ones are dropped
    /// (default: 1024)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Store failure alerting (optional)
    #[serde(default)]
    pub alerts: Option<AlertConfig>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dispatch: DispatchMode::default(),
            queue_capacity: default_queue_capacity(),
            alerts: None,
        }
    }
}

/// Alerting on sustained audit store failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Enable alert dispatch (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds of continuous failure before the first alert
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: u64,

    /// Minimum seconds between repeated alerts
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Send a recovery notice once appends succeed again
    #[serde(default = "default_true")]
    pub notify_recovery: bool,

    /// Webhook destinations
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_secs: default_threshold_secs(),
            cooldown_secs: default_cooldown_secs(),
            notify_recovery: true,
            webhooks: Vec::new(),
        }
    }
}

/// A single alert webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Destination URL for POST requests
    pub url: String,

    /// Request timeout in seconds (default: 5)
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,

    /// Extra headers (e.g. `Authorization`)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_threshold_secs() -> u64 {
    60
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_webhook_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_config_defaults() {
        let config = AuditConfig::default();
        assert!(config.enabled);
        assert_eq!(config.dispatch, DispatchMode::Inline);
        assert_eq!(config.queue_capacity, 1024);
        assert!(config.alerts.is_none());
    }

    #[test]
    fn test_alert_config_defaults() {
        let config = AlertConfig::default();
        assert!(config.enabled);
        assert_eq!(config.threshold_secs, 60);
        assert_eq!(config.cooldown_secs, 300);
        assert!(config.notify_recovery);
        assert!(config.webhooks.is_empty());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "dispatch": "background",
            "alerts": { "webhooks": [{ "url": "https://ops.example/hook" }] }
        }"#;
        let config: AuditConfig = serde_json::from_str(json).unwrap();

        assert!(config.enabled);
        assert_eq!(config.dispatch, DispatchMode::Background);
        let alerts = config.alerts.unwrap();
        assert_eq!(alerts.threshold_secs, 60);
        assert_eq!(alerts.webhooks[0].url, "https://ops.example/hook");
        assert_eq!(alerts.webhooks[0].timeout_secs, 5);
    }
}
