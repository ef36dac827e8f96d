//! Persistence hooks that turn entity mutations into audit records
//!
//! Repositories call into a [`ChangeInterceptor`] after create and update,
//! and on both sides of a delete. The interceptor checks the statically
//! declared [`TrackedEntitySet`] first; an untracked type costs one slice
//! scan and nothing else.
//!
//! Everything the record needs (entity reference and request context) is
//! captured synchronously, by value, at event time. Only the append itself
//! is asynchronous.

use std::fmt;

use super::context;
use super::entity::{self, Auditable, EntityType};
use super::record::{AuditAction, AuditRecord};
use super::writer::AuditWriter;

/// Closed set of entity types whose mutations are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedEntitySet {
    types: &'static [EntityType],
}

impl TrackedEntitySet {
    /// Track exactly `types`
    pub const fn new(types: &'static [EntityType]) -> Self {
        Self { types }
    }

    /// The institution's content, notice and document types
    pub const fn institutional() -> Self {
        Self::new(crate::content::TRACKED_ENTITIES)
    }

    /// Whether `entity_type` is tracked
    pub fn contains(&self, entity_type: &EntityType) -> bool {
        self.types.contains(entity_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TrackedEntitySet {
    fn default() -> Self {
        Self::institutional()
    }
}

/// Persistence event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Resulting audit action
    pub const fn action(&self) -> AuditAction {
        match self {
            Self::Created => AuditAction::Create,
            Self::Updated => AuditAction::Update,
            Self::Deleted => AuditAction::Delete,
        }
    }

    /// Resulting audit message
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A change captured at event time, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedChange {
    record: AuditRecord,
}

impl CapturedChange {
    pub fn record(&self) -> &AuditRecord {
        &self.record
    }

    pub fn into_record(self) -> AuditRecord {
        self.record
    }
}

/// Observes persistence events on tracked types and forwards them to the
/// audit writer
#[derive(Debug, Clone)]
pub struct ChangeInterceptor {
    tracked: TrackedEntitySet,
    writer: AuditWriter,
}

impl ChangeInterceptor {
    pub fn new(tracked: TrackedEntitySet, writer: AuditWriter) -> Self {
        Self { tracked, writer }
    }

    pub fn tracked(&self) -> &TrackedEntitySet {
        &self.tracked
    }

    pub fn writer(&self) -> &AuditWriter {
        &self.writer
    }

    /// Whether mutations of `E` produce records
    pub fn observes<E: Auditable>(&self) -> bool {
        self.tracked.contains(&E::ENTITY_TYPE)
    }

    /// Snapshot a change of `entity` together with the current request context
    ///
    /// `None` when the type is untracked or its metadata is unresolved.
    pub fn capture<E: Auditable>(&self, kind: ChangeKind, entity: &E) -> Option<CapturedChange> {
        if !self.observes::<E>() {
            return None;
        }

        let Some(reference) = entity::resolve(entity) else {
            tracing::debug!(
                entity_type = %E::ENTITY_TYPE,
                change = %kind,
                "Entity type metadata unresolved, audit skipped"
            );
            return None;
        };

        let record = AuditRecord::new(kind.action())
            .with_context(&context::get())
            .with_entity(reference)
            .with_message(kind.message());

        Some(CapturedChange { record })
    }

    /// Write a captured change, best-effort
    pub async fn dispatch(&self, change: Option<CapturedChange>) {
        if let Some(change) = change {
            self.writer.append(change.record).await;
        }
    }

    /// Post-create / post-update hook
    ///
    /// `created` tells whether this save inserted the row.
    pub async fn post_save<E: Auditable>(&self, entity: &E, created: bool) {
        let kind = if created {
            ChangeKind::Created
        } else {
            ChangeKind::Updated
        };
        let change = self.capture(kind, entity);
        self.dispatch(change).await;
    }

    /// Capture a delete while the row, and so its id, still exists
    pub fn pre_delete<E: Auditable>(&self, entity: &E) -> Option<CapturedChange> {
        self.capture(ChangeKind::Deleted, entity)
    }

    /// Post-delete hook, fed by [`pre_delete`](Self::pre_delete)
    pub async fn post_delete(&self, captured: Option<CapturedChange>) {
        self.dispatch(captured).await;
    }
}
