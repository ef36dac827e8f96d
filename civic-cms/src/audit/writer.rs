//! Best-effort audit writer
//!
//! The writer stamps records with a non-decreasing timestamp and hands them
//! to an [`AuditStore`]. It never reports failure to its caller: a failed
//! append is logged, counted by the failure tracker and dropped. It is never
//! retried against the mutation that produced it.
//!
//! Two dispatch modes are available:
//!
//! - **inline**: the caller awaits the append. The append itself runs on a
//!   spawned task, so dropping the caller's future (request cancelled) does
//!   not abort a write already under way.
//! - **background**: records are queued by value onto one sequential worker.
//!   The queue is bounded by `queue_capacity`; a record arriving at a full
//!   queue is dropped and counted as a store failure, so a slow or failing
//!   store cannot grow memory without limit. [`AuditWriter::flush`] waits
//!   until everything queued before it has been handled.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};

use super::alert::{AuditAlertHook, LogAlertHook};
use super::alert_webhook::WebhookAlertHook;
use super::config::{AuditConfig, DispatchMode};
use super::context::{self, Actor};
use super::entity::EntityType;
use super::failure_tracker::FailureTracker;
use super::record::{AuditAction, AuditRecord};
use super::storage::AuditStore;

/// Label used for login and logout records
pub const USER_ENTITY: EntityType = EntityType::new("accounts", "User");

enum Command {
    Append(AuditRecord),
    Flush(oneshot::Sender<()>),
}

/// Hands audit records to the store
///
/// Cheap to clone; clones share the store, clock and worker.
#[derive(Clone)]
pub struct AuditWriter {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Sink,
    enabled: bool,
    clock: MonotonicClock,
    queue: Option<mpsc::Sender<Command>>,
    dropped: AtomicU64,
}

/// Store plus failure tracking; the part the background worker owns
#[derive(Clone)]
struct Sink {
    store: Arc<dyn AuditStore>,
    tracker: Option<Arc<FailureTracker>>,
}

impl fmt::Debug for AuditWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditWriter")
            .field("enabled", &self.inner.enabled)
            .field("background", &self.inner.queue.is_some())
            .field("dropped", &self.dropped_records())
            .field("alerts", &self.inner.sink.tracker.is_some())
            .finish()
    }
}

impl AuditWriter {
    /// Create a writer over `store`
    ///
    /// Background dispatch spawns its worker on the current Tokio runtime. If
    /// there is none, the writer falls back to inline dispatch.
    pub fn new(
        store: Arc<dyn AuditStore>,
        config: &AuditConfig,
        service_name: impl Into<String>,
    ) -> Self {
        let tracker = config
            .alerts
            .as_ref()
            .filter(|alerts| alerts.enabled)
            .map(|alerts| {
                let mut hooks: Vec<Arc<dyn AuditAlertHook>> = vec![Arc::new(LogAlertHook)];
                hooks.extend(alerts.webhooks.iter().map(|webhook| {
                    Arc::new(WebhookAlertHook::from_config(webhook)) as Arc<dyn AuditAlertHook>
                }));
                Arc::new(FailureTracker::new(hooks, alerts, service_name))
            });

        Self::build(store, config, tracker)
    }

    /// Inline writer with no alerting, mostly for tests and tools
    pub fn inline(store: Arc<dyn AuditStore>) -> Self {
        Self::build(store, &AuditConfig::default(), None)
    }

    fn build(
        store: Arc<dyn AuditStore>,
        config: &AuditConfig,
        tracker: Option<Arc<FailureTracker>>,
    ) -> Self {
        let (queue, receiver) = match (config.dispatch, tokio::runtime::Handle::try_current()) {
            (DispatchMode::Background, Ok(_)) => {
                let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
                (Some(tx), Some(rx))
            }
            (DispatchMode::Background, Err(_)) => {
                tracing::warn!("No Tokio runtime for the audit worker; using inline dispatch");
                (None, None)
            }
            (DispatchMode::Inline, _) => (None, None),
        };

        let sink = Sink { store, tracker };
        if let Some(receiver) = receiver {
            tokio::spawn(Self::run_worker(sink.clone(), receiver));
        }

        Self {
            inner: Arc::new(Inner {
                sink,
                enabled: config.enabled,
                clock: MonotonicClock::default(),
                queue,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Whether records are being written at all
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Records dropped because the background queue was full
    pub fn dropped_records(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// The underlying store, for read-side queries
    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.inner.sink.store
    }

    /// Append a record, best-effort
    ///
    /// Returns once the record has been committed (inline) or queued
    /// (background, or dropped when the queue is full). Failures never reach
    /// the caller.
    pub async fn append(&self, mut record: AuditRecord) {
        if !self.inner.enabled {
            return;
        }
        record.created_at = self.inner.clock.stamp(record.created_at);

        match &self.inner.queue {
            Some(queue) => {
                if let Err(e) = queue.try_send(Command::Append(record)) {
                    let reason = match &e {
                        mpsc::error::TrySendError::Full(_) => {
                            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                            "audit queue is full"
                        }
                        mpsc::error::TrySendError::Closed(_) => "audit worker has stopped",
                    };
                    if let Command::Append(record) = e.into_inner() {
                        self.inner.sink.failed(&record, reason);
                    }
                }
            }
            None => {
                let sink = self.inner.sink.clone();
                let task = tokio::spawn(async move { sink.write(record).await });
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "Audit append task did not complete");
                }
            }
        }
    }

    /// Wait until every record queued so far has been handled
    ///
    /// A no-op for inline writers.
    pub async fn flush(&self) {
        let Some(queue) = &self.inner.queue else {
            return;
        };
        let (tx, rx) = oneshot::channel();
        if queue.send(Command::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Record a LOGIN or LOGOUT for `actor`
    ///
    /// The actor is always `actor`, whoever the request context names; only
    /// the IP address and user agent are taken from the context. `display` is
    /// the user's display string at event time.
    pub async fn log_auth(&self, action: AuditAction, actor: &Actor, display: &str) {
        let mut ctx = context::get();
        ctx.actor = Some(actor.clone());
        let message = match action {
            AuditAction::Login => "Logged in",
            AuditAction::Logout => "Logged out",
            _ => "",
        };
        let record = AuditRecord::new(action)
            .with_context(&ctx)
            .with_target(USER_ENTITY, actor.id.to_string(), display)
            .with_message(message);
        self.append(record).await;
    }

    /// Runs until every writer clone has been dropped
    async fn run_worker(sink: Sink, mut receiver: mpsc::Receiver<Command>) {
        tracing::debug!("Audit worker started");
        while let Some(command) = receiver.recv().await {
            match command {
                Command::Append(record) => sink.write(record).await,
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        tracing::debug!("Audit worker stopped");
    }
}

impl Sink {
    async fn write(&self, record: AuditRecord) {
        match self.store.append(&record).await {
            Ok(()) => {
                tracing::debug!(
                    record_id = %record.id,
                    action = %record.action,
                    entity_type = %record.entity_type,
                    entity_id = %record.entity_id,
                    "Audit record appended"
                );
                if let Some(tracker) = &self.tracker {
                    tracker.record_success();
                }
            }
            Err(e) => self.failed(&record, &e.to_string()),
        }
    }

    fn failed(&self, record: &AuditRecord, error: &str) {
        tracing::error!(
            record_id = %record.id,
            action = %record.action,
            entity_type = %record.entity_type,
            entity_id = %record.entity_id,
            error = %error,
            "Audit append failed; record dropped"
        );
        if let Some(tracker) = &self.tracker {
            tracker.record_failure(error);
        }
    }
}

/// Clamps timestamps so they never go backwards
#[derive(Default)]
struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    fn stamp(&self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let stamped = match *last {
            Some(previous) if previous > candidate => previous,
            _ => candidate,
        };
        *last = Some(stamped);
        stamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::config::AlertConfig;
    use crate::audit::context::RequestContext;
    use crate::audit::query::AuditQuery;
    use crate::audit::storage::MemoryAuditStore;
    use crate::error::Error;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::AtomicBool;
    use uuid::Uuid;

    /// Store whose appends always fail
    #[derive(Default)]
    struct BrokenStore {
        attempts: AtomicU64,
    }

    #[async_trait]
    impl AuditStore for BrokenStore {
        async fn append(&self, _record: &AuditRecord) -> Result<(), Error> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::Audit("connection refused".to_string()))
        }

        async fn query(&self, _query: &AuditQuery) -> Result<crate::audit::AuditPage, Error> {
            Err(Error::Audit("connection refused".to_string()))
        }

        async fn get(&self, _id: Uuid) -> Result<Option<AuditRecord>, Error> {
            Err(Error::Audit("connection refused".to_string()))
        }

        async fn forget_actor(&self, _actor_id: i64) -> Result<u64, Error> {
            Err(Error::Audit("connection refused".to_string()))
        }
    }

    /// Memory store that refuses appends while switched offline
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryAuditStore,
        offline: AtomicBool,
    }

    #[async_trait]
    impl AuditStore for FlakyStore {
        async fn append(&self, record: &AuditRecord) -> Result<(), Error> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Audit("audit store offline".to_string()));
            }
            self.inner.append(record).await
        }

        async fn query(&self, query: &AuditQuery) -> Result<crate::audit::AuditPage, Error> {
            self.inner.query(query).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<AuditRecord>, Error> {
            self.inner.get(id).await
        }

        async fn forget_actor(&self, actor_id: i64) -> Result<u64, Error> {
            self.inner.forget_actor(actor_id).await
        }
    }

    #[test]
    fn test_clock_never_goes_backwards() {
        let clock = MonotonicClock::default();
        let now = Utc::now();
        assert_eq!(clock.stamp(now), now);
        assert_eq!(clock.stamp(now - Duration::seconds(5)), now);
        let later = now + Duration::seconds(1);
        assert_eq!(clock.stamp(later), later);
    }

    #[tokio::test]
    async fn test_inline_append_is_committed_on_return() {
        let store = Arc::new(MemoryAuditStore::new());
        let writer = AuditWriter::inline(store.clone());

        writer.append(AuditRecord::new(AuditAction::Create)).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_timestamps_non_decreasing() {
        let store = Arc::new(MemoryAuditStore::new());
        let writer = AuditWriter::inline(store.clone());

        let mut early = AuditRecord::new(AuditAction::Update);
        early.created_at = Utc::now() - Duration::hours(1);
        writer.append(AuditRecord::new(AuditAction::Create)).await;
        writer.append(early).await;

        let records = store.snapshot().await;
        assert!(records[1].created_at >= records[0].created_at);
    }

    #[tokio::test]
    async fn test_background_flush_drains_queue() {
        let store = Arc::new(MemoryAuditStore::new());
        let config = AuditConfig {
            dispatch: DispatchMode::Background,
            ..AuditConfig::default()
        };
        let writer = AuditWriter::new(store.clone(), &config, "civic-cms");

        for _ in 0..25 {
            writer.append(AuditRecord::new(AuditAction::Update)).await;
        }
        writer.flush().await;
        assert_eq!(store.len().await, 25);
    }

    #[tokio::test]
    async fn test_full_queue_drops_and_counts() {
        let store = Arc::new(MemoryAuditStore::new());
        let config = AuditConfig {
            dispatch: DispatchMode::Background,
            queue_capacity: 2,
            ..AuditConfig::default()
        };
        let writer = AuditWriter::new(store.clone(), &config, "civic-cms");

        // the worker cannot run before the first await that yields
        for _ in 0..5 {
            writer.append(AuditRecord::new(AuditAction::Update)).await;
        }
        assert_eq!(writer.dropped_records(), 3);

        writer.flush().await;
        assert_eq!(store.len().await, 2);

        writer.append(AuditRecord::new(AuditAction::Update)).await;
        writer.flush().await;
        assert_eq!(store.len().await, 3);
        assert_eq!(writer.dropped_records(), 3);
    }

    #[tokio::test]
    async fn test_background_snapshot_is_taken_at_event_time() {
        let store = Arc::new(MemoryAuditStore::new());
        let config = AuditConfig {
            dispatch: DispatchMode::Background,
            ..AuditConfig::default()
        };
        let writer = AuditWriter::new(store.clone(), &config, "civic-cms");

        let ctx = RequestContext::anonymous().with_actor(Actor::new(1, "alice"));
        context::scope(ctx.clone(), {
            let writer = writer.clone();
            async move {
                let record = AuditRecord::new(AuditAction::Update).with_context(&context::get());
                writer.append(record).await;
                context::set(RequestContext::anonymous());
            }
        })
        .await;

        writer.flush().await;
        assert_eq!(store.snapshot().await[0].actor_name(), Some("alice"));
    }

    #[tokio::test]
    async fn test_failed_append_is_swallowed_and_tracked() {
        let store = Arc::new(BrokenStore::default());
        let config = AuditConfig {
            alerts: Some(AlertConfig::default()),
            ..AuditConfig::default()
        };
        let writer = AuditWriter::new(store.clone(), &config, "civic-cms");

        writer.append(AuditRecord::new(AuditAction::Delete)).await;
        writer.append(AuditRecord::new(AuditAction::Delete)).await;

        // attempted once each, never retried
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
        let tracker = writer.inner.sink.tracker.as_ref().unwrap();
        assert_eq!(tracker.consecutive_failures(), 2);
    }

    #[tokio::test]
    async fn test_success_after_outage_resets_failures() {
        let store = Arc::new(FlakyStore::default());
        let config = AuditConfig {
            alerts: Some(AlertConfig::default()),
            ..AuditConfig::default()
        };
        let writer = AuditWriter::new(store.clone(), &config, "civic-cms");
        let tracker = writer.inner.sink.tracker.clone().unwrap();

        store.offline.store(true, Ordering::SeqCst);
        writer.append(AuditRecord::new(AuditAction::Create)).await;
        writer.append(AuditRecord::new(AuditAction::Update)).await;
        assert_eq!(tracker.consecutive_failures(), 2);
        assert!(store.inner.is_empty().await);

        store.offline.store(false, Ordering::SeqCst);
        writer.append(AuditRecord::new(AuditAction::Delete)).await;
        assert_eq!(tracker.consecutive_failures(), 0);

        let records = store.inner.snapshot().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::Delete);
    }

    #[tokio::test]
    async fn test_disabled_writer_drops_records() {
        let store = Arc::new(MemoryAuditStore::new());
        let config = AuditConfig {
            enabled: false,
            ..AuditConfig::default()
        };
        let writer = AuditWriter::new(store.clone(), &config, "civic-cms");

        writer.append(AuditRecord::new(AuditAction::Create)).await;
        assert!(store.is_empty().await);
        assert!(!writer.is_enabled());
    }

    #[tokio::test]
    async fn test_log_auth_uses_request_context() {
        let store = Arc::new(MemoryAuditStore::new());
        let writer = AuditWriter::inline(store.clone());
        let alice = Actor::new(1, "alice");

        let ctx = RequestContext::anonymous().with_ip("203.0.113.5".parse().unwrap());
        context::scope(
            ctx,
            writer.log_auth(AuditAction::Login, &alice, "Alice Wanjiru"),
        )
        .await;

        let record = &store.snapshot().await[0];
        assert_eq!(record.action, AuditAction::Login);
        assert_eq!(record.entity_type, "accounts.User");
        assert_eq!(record.entity_id, "1");
        assert_eq!(record.entity_repr, "Alice Wanjiru");
        assert_eq!(record.actor_name(), Some("alice"));
        assert_eq!(record.ip_address, Some("203.0.113.5".parse().unwrap()));
        assert_eq!(record.message, "Logged in");
    }
}
