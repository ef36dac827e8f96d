//! Request-attributed audit trail
//!
//! # Architecture
//!
//! ```text
//! request ──► audit_context_middleware ──► context::scope
//!                                              │
//!   repository save/delete ──► ChangeInterceptor (allow-list, resolve,
//!                                              │  context snapshot)
//!                                              ▼
//!                                         AuditWriter ──► AuditStore
//! ```
//!
//! Entities opt in by implementing [`Auditable`] and by being listed in the
//! [`TrackedEntitySet`]. Auditing is best-effort throughout: no failure in
//! this module ever fails the mutation that triggered it.

pub mod alert;
pub mod alert_webhook;
pub mod config;
pub mod context;
pub mod entity;
pub(crate) mod failure_tracker;
pub mod handlers;
pub mod interceptor;
pub mod middleware;
pub mod query;
pub mod record;
pub mod storage;
pub mod writer;

pub use alert::{AuditAlertEvent, AuditAlertHook, LogAlertHook};
pub use alert_webhook::WebhookAlertHook;
pub use config::{AlertConfig, AuditConfig, DispatchMode, WebhookConfig};
pub use context::{Actor, RequestContext};
pub use entity::{resolve, Auditable, EntityRef, EntityType, ReprError};
pub use handlers::audit_routes;
pub use interceptor::{CapturedChange, ChangeInterceptor, ChangeKind, TrackedEntitySet};
pub use middleware::audit_context_middleware;
pub use query::{AuditPage, AuditQuery, SortOrder};
pub use record::{AuditAction, AuditRecord};
pub use storage::{AuditStore, MemoryAuditStore};
pub use writer::AuditWriter;

#[cfg(feature = "database")]
pub use storage::PgAuditStore;
