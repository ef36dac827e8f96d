//! Institutional content: departments, services, pages, news and careers
//!
//! Also home to the pieces every domain model shares: the [`Model`]
//! contract, record metadata, the publication lifecycle and the in-memory
//! [`Repository`] that fires audit hooks.

pub mod actions;
pub mod lifecycle;
pub mod model;
pub mod models;
pub mod repository;

pub use actions::{archive_selected, publish_selected, stamp_author};
pub use lifecycle::{Lifecycle, PublishStatus, Publishable};
pub use model::{slugify, Model, RecordMeta};
pub use models::{
    CareerPosting, Department, NewsItem, NewsType, Page, PageKey, Service, SiteSettings,
};
pub use repository::{MemoryRepository, Repository};

use crate::audit::{Auditable, EntityType};
use crate::downloads::Document;
use crate::notices::Notice;

/// Entity types whose changes are audited
///
/// Site settings and user accounts are not tracked.
pub const TRACKED_ENTITIES: &[EntityType] = &[
    Page::ENTITY_TYPE,
    Department::ENTITY_TYPE,
    Service::ENTITY_TYPE,
    NewsItem::ENTITY_TYPE,
    CareerPosting::ENTITY_TYPE,
    Notice::ENTITY_TYPE,
    Document::ENTITY_TYPE,
];
