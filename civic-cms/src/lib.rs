//! # civic-cms
//!
//! Content-management backend for a government institution, with a uniform,
//! request-attributed audit trail.
//!
//! ## Features
//!
//! - **Audit trail**: every create, update and delete of tracked content is
//!   recorded with who did it, from where, and when
//! - **Request context**: a task-local scope per request, so concurrent
//!   requests never see each other's principal
//! - **Best-effort writes**: an unreachable audit store never fails the
//!   mutation that triggered it; sustained failures raise alerts instead
//! - **Storage**: in-memory, or PostgreSQL with an append-only guard
//!   (`database` feature)
//! - **HTTP**: context middleware and a read-only `/audit-logs` listing
//!
//! ## Example
//!
//! ```rust,no_run
//! use civic_cms::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::from_config(config.clone()).await?;
//!     let pages = MemoryRepository::<Page>::with_interceptor(state.interceptor().clone());
//!
//!     let alice = RequestContext::anonymous().with_actor(Actor::new(1, "alice"));
//!     context::scope(alice, pages.save(Page::new(PageKey::About, "About"))).await?;
//!
//!     Server::new(config).serve(router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod audit;
pub mod config;
pub mod content;
pub mod downloads;
pub mod error;
pub mod notices;
pub mod observability;
pub mod server;
pub mod state;

#[cfg(feature = "database")]
pub mod database;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::accounts::{record_login, record_logout, remove_user, User, UserRole};
    pub use crate::audit::{
        audit_context_middleware, audit_routes, context, Actor, AuditAction, AuditConfig,
        AuditPage, AuditQuery, AuditRecord, AuditStore, AuditWriter, Auditable,
        ChangeInterceptor, DispatchMode, EntityType, MemoryAuditStore, RequestContext,
        SortOrder, TrackedEntitySet,
    };
    pub use crate::config::{Config, DatabaseConfig, ServiceConfig};
    pub use crate::content::{
        archive_selected, publish_selected, stamp_author, CareerPosting, Department,
        MemoryRepository, Model, NewsItem, NewsType, Page, PageKey, PublishStatus, Publishable,
        Repository, Service, SiteSettings,
    };
    pub use crate::downloads::{Document, DocumentCategory};
    pub use crate::error::{Error, Result};
    pub use crate::notices::Notice;
    pub use crate::observability::init_tracing;
    pub use crate::server::{router, with_audit_context, Server};
    pub use crate::state::AppState;

    #[cfg(feature = "database")]
    pub use crate::audit::PgAuditStore;

    #[cfg(feature = "database")]
    pub use crate::database::create_pool;

    pub use axum::{routing::get, Router};
}
