//! Audit record storage trait and backend implementations
//!
//! Stores are append-only. The single permitted mutation of an existing
//! record is clearing its actor reference when that principal is removed
//! ([`AuditStore::forget_actor`]). The PostgreSQL backend enforces this at
//! the database level with a guard trigger; the in-memory backend simply
//! exposes no other mutation.
//!
//! # Available Backends
//!
//! - **Memory** (always available): process-local, used by tests and when no
//!   database is configured
//! - **PostgreSQL** (`database` feature): durable, queryable with SQL

use async_trait::async_trait;
use uuid::Uuid;

use super::query::{AuditPage, AuditQuery};
use super::record::AuditRecord;
use crate::error::Error;

mod memory;
pub use memory::MemoryAuditStore;

#[cfg(feature = "database")]
pub mod pg;

#[cfg(feature = "database")]
pub use pg::PgAuditStore;

/// Trait for audit record persistence backends
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a record
    ///
    /// Either the whole record is durable when this returns `Ok`, or nothing
    /// is written.
    async fn append(&self, record: &AuditRecord) -> Result<(), Error>;

    /// Filtered, paginated listing
    async fn query(&self, query: &AuditQuery) -> Result<AuditPage, Error>;

    /// Fetch one record by id
    async fn get(&self, id: Uuid) -> Result<Option<AuditRecord>, Error>;

    /// Clear the actor reference on every record attributed to `actor_id`
    ///
    /// Returns the number of records affected. The records themselves remain.
    async fn forget_actor(&self, actor_id: i64) -> Result<u64, Error>;
}
