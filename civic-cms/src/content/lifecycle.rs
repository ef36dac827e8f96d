//! Draft → published → archived lifecycle shared by content entities
//!
//! Transitions only mutate the in-memory entity. Saving it afterwards is
//! what produces the UPDATE audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Publication state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PublishStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Label shown to editors
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::Archived => "Archived",
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle fields of a publishable entity
///
/// Fields are private so that `Published` always comes with a publish time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    status: PublishStatus,
    published_at: Option<DateTime<Utc>>,
    archived_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    /// A new draft
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> PublishStatus {
        self.status
    }

    /// Time of first publication; survives archiving and re-publishing
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub fn is_published(&self) -> bool {
        self.status == PublishStatus::Published
    }

    /// Publish as of now
    pub fn publish(&mut self) {
        self.publish_at(Utc::now());
    }

    /// Publish as of `now`
    ///
    /// Keeps an earlier publish time and clears any archive time.
    pub fn publish_at(&mut self, now: DateTime<Utc>) {
        self.status = PublishStatus::Published;
        self.published_at.get_or_insert(now);
        self.archived_at = None;
    }

    /// Archive as of now
    pub fn archive(&mut self) {
        self.archive_at(Utc::now());
    }

    /// Archive as of `now`, leaving the publish time alone
    pub fn archive_at(&mut self, now: DateTime<Utc>) {
        self.status = PublishStatus::Archived;
        self.archived_at = Some(now);
    }
}

/// Capability of going through the publication lifecycle
///
/// Implementors expose their [`Lifecycle`]; the transitions come for free.
pub trait Publishable {
    fn lifecycle(&self) -> &Lifecycle;

    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    fn publish(&mut self) {
        self.lifecycle_mut().publish();
    }

    fn archive(&mut self) {
        self.lifecycle_mut().archive();
    }

    fn status(&self) -> PublishStatus {
        self.lifecycle().status()
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().published_at()
    }

    fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().archived_at()
    }

    fn is_published(&self) -> bool {
        self.lifecycle().is_published()
    }
}
