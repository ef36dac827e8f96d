//! Audit store health alerts
//!
//! When appends keep failing the writer still lets the triggering mutation
//! succeed, so the only trace of the gap is in logs and in these alerts.
//! Hooks run inside `tokio::spawn` and never delay a save.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Change in audit store health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum AuditAlertEvent {
    /// Appends have been failing for longer than the configured threshold
    StoreUnreachable {
        /// Wall-clock time of the first failure in the current outage
        first_failure_at: DateTime<Utc>,
        /// Number of consecutive failed appends
        consecutive_failures: u64,
        /// Seconds since the first failure
        unreachable_duration_secs: u64,
        /// Error message from the most recent failure
        last_error: String,
        /// Service the writer belongs to
        service_name: String,
    },
    /// Appends succeed again after an alert
    StoreRecovered {
        /// When the outage started
        outage_started_at: DateTime<Utc>,
        /// When the first append succeeded again
        recovered_at: DateTime<Utc>,
        /// Total outage duration (seconds)
        outage_duration_secs: u64,
        /// Audit records lost during the outage
        records_lost: u64,
        /// Service the writer belongs to
        service_name: String,
    },
}

impl AuditAlertEvent {
    /// Service name carried by the event
    pub fn service_name(&self) -> &str {
        match self {
            Self::StoreUnreachable { service_name, .. }
            | Self::StoreRecovered { service_name, .. } => service_name,
        }
    }
}

/// Receiver of audit store health alerts
///
/// Implementations handle their own errors; there is nobody to report them
/// to.
#[async_trait]
pub trait AuditAlertHook: Send + Sync + 'static {
    /// Called for every alert
    async fn on_alert(&self, event: AuditAlertEvent);
}

/// Hook that re-emits alerts as structured log lines
///
/// Always installed, so alerts reach the log pipeline even without webhooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertHook;

#[async_trait]
impl AuditAlertHook for LogAlertHook {
    async fn on_alert(&self, event: AuditAlertEvent) {
        match &event {
            AuditAlertEvent::StoreUnreachable {
                consecutive_failures,
                unreachable_duration_secs,
                last_error,
                service_name,
                ..
            } => tracing::error!(
                alert = true,
                service_name = %service_name,
                consecutive_failures,
                unreachable_duration_secs,
                last_error = %last_error,
                "Audit store unreachable"
            ),
            AuditAlertEvent::StoreRecovered {
                outage_duration_secs,
                records_lost,
                service_name,
                ..
            } => tracing::warn!(
                alert = true,
                service_name = %service_name,
                outage_duration_secs,
                records_lost,
                "Audit store recovered"
            ),
        }
    }
}
