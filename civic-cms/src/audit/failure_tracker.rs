//! Audit store failure tracking
//!
//! Counts consecutive failed appends. Once failures have persisted past the
//! threshold an [`AuditAlertEvent::StoreUnreachable`] goes to every hook (at
//! most once per cooldown); the first success after an alert sends
//! [`AuditAlertEvent::StoreRecovered`].

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::alert::{AuditAlertEvent, AuditAlertHook};
use super::config::AlertConfig;

#[derive(Default)]
struct Outage {
    started: Option<(Instant, DateTime<Utc>)>,
    consecutive_failures: u64,
    last_error: String,
    last_alert_at: Option<Instant>,
    alerted: bool,
}

/// Tracks audit store failures for one writer
///
/// The lock is never held while hooks run.
pub(crate) struct FailureTracker {
    outage: Mutex<Outage>,
    hooks: Vec<Arc<dyn AuditAlertHook>>,
    threshold: Duration,
    cooldown: Duration,
    notify_recovery: bool,
    service_name: String,
}

impl FailureTracker {
    pub(crate) fn new(
        hooks: Vec<Arc<dyn AuditAlertHook>>,
        config: &AlertConfig,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            outage: Mutex::new(Outage::default()),
            hooks,
            threshold: Duration::from_secs(config.threshold_secs),
            cooldown: Duration::from_secs(config.cooldown_secs),
            notify_recovery: config.notify_recovery,
            service_name: service_name.into(),
        }
    }

    /// Number of failures in the current outage
    pub(crate) fn consecutive_failures(&self) -> u64 {
        self.outage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .consecutive_failures
    }

    pub(crate) fn record_failure(&self, error: &str) {
        let alert = {
            let mut outage = self.outage.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let (started_at, started_wall) = *outage.started.get_or_insert((now, Utc::now()));

            outage.consecutive_failures += 1;
            outage.last_error = error.to_string();

            let elapsed = now.duration_since(started_at);
            let cooled_down = outage
                .last_alert_at
                .map(|last| now.duration_since(last) >= self.cooldown)
                .unwrap_or(true);

            if elapsed >= self.threshold && cooled_down {
                outage.last_alert_at = Some(now);
                outage.alerted = true;
                Some(AuditAlertEvent::StoreUnreachable {
                    first_failure_at: started_wall,
                    consecutive_failures: outage.consecutive_failures,
                    unreachable_duration_secs: elapsed.as_secs(),
                    last_error: outage.last_error.clone(),
                    service_name: self.service_name.clone(),
                })
            } else {
                None
            }
        };

        if let Some(event) = alert {
            self.dispatch(event);
        }
    }

    pub(crate) fn record_success(&self) {
        let recovery = {
            let mut outage = self.outage.lock().unwrap_or_else(PoisonError::into_inner);
            if outage.started.is_none() {
                return;
            }
            let finished = std::mem::take(&mut *outage);

            match finished.started {
                Some((_, started_wall)) if finished.alerted && self.notify_recovery => {
                    let now = Utc::now();
                    Some(AuditAlertEvent::StoreRecovered {
                        outage_started_at: started_wall,
                        recovered_at: now,
                        outage_duration_secs: (now - started_wall).num_seconds().max(0) as u64,
                        records_lost: finished.consecutive_failures,
                        service_name: self.service_name.clone(),
                    })
                }
                _ => None,
            }
        };

        if let Some(event) = recovery {
            self.dispatch(event);
        }
    }

    /// Fan the event out to every hook on a detached task
    fn dispatch(&self, event: AuditAlertEvent) {
        let hooks = self.hooks.clone();
        tokio::spawn(async move {
            join_all(hooks.iter().map(|hook| hook.on_alert(event.clone()))).await;
        });
    }
}
