//! Read-side filtering of the audit trail
//!
//! One [`AuditQuery`] drives both the in-memory store and the SQL store, so
//! the two backends agree on what a filter means.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{AuditAction, AuditRecord};

/// Default number of records per page
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Maximum allowed records per page
pub const MAX_PER_PAGE: u32 = 100;

/// Sort direction by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first
    Asc,
    /// Newest first
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL `ORDER BY` fragment
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Filter and pagination for audit listings
///
/// Deserializes directly from the `/audit-logs` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Only records by this actor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<i64>,

    /// Only records on this entity type label, e.g. `content.Page`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Only records on this entity id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Only records with this action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<AuditAction>,

    /// Inclusive lower bound on `created_at`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `created_at`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,

    /// Case-insensitive substring over actor username, entity type, entity
    /// id, display string, message, IP address and user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Sort direction, newest first by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,

    /// 1-indexed page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Records per page, clamped to [`MAX_PER_PAGE`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl AuditQuery {
    /// Empty query: everything, newest first, first page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Page number, at least 1
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size in `1..=MAX_PER_PAGE`
    pub fn items_per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Number of records to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number() - 1) * u64::from(self.items_per_page())
    }

    pub fn sort_order(&self) -> SortOrder {
        self.order.unwrap_or_default()
    }

    /// Trimmed search needle, if non-blank
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether a record passes every filter (pagination aside)
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(actor_id) = self.actor_id {
            if record.actor.as_ref().map(|a| a.id) != Some(actor_id) {
                return false;
            }
        }
        if let Some(entity_type) = &self.entity_type {
            if &record.entity_type != entity_type {
                return false;
            }
        }
        if let Some(entity_id) = &self.entity_id {
            if &record.entity_id != entity_id {
                return false;
            }
        }
        if let Some(action) = self.action {
            if record.action != action {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.created_at > until {
                return false;
            }
        }
        if let Some(needle) = self.search_term() {
            let needle = needle.to_lowercase();
            let ip = record.ip_address.map(|ip| ip.to_string()).unwrap_or_default();
            let haystacks = [
                record.actor_name().unwrap_or_default(),
                record.entity_type.as_str(),
                record.entity_id.as_str(),
                record.entity_repr.as_str(),
                record.message.as_str(),
                ip.as_str(),
                record.user_agent.as_str(),
            ];
            if !haystacks
                .iter()
                .any(|h| h.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// One page of audit records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    /// Records on this page
    pub records: Vec<AuditRecord>,
    /// Matching records across all pages
    pub total: u64,
    /// 1-indexed page number
    pub page: u32,
    /// Page size used
    pub per_page: u32,
}

impl AuditPage {
    /// Total number of pages (at least 1)
    pub fn total_pages(&self) -> u64 {
        let per_page = u64::from(self.per_page.max(1));
        self.total.div_ceil(per_page).max(1)
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::context::{Actor, RequestContext};
    use chrono::Duration;

    fn page_record(actor: Option<Actor>, repr: &str) -> AuditRecord {
        let ctx = match actor {
            Some(actor) => RequestContext::anonymous().with_actor(actor),
            None => RequestContext::anonymous(),
        };
        AuditRecord::new(AuditAction::Update)
            .with_context(&ctx)
            .with_message("Updated")
            .with_target(
                crate::audit::EntityType::new("content", "Page"),
                "1",
                repr,
            )
    }

    #[test]
    fn test_pagination_defaults_and_clamping() {
        let query = AuditQuery::new();
        assert_eq!(query.page_number(), 1);
        assert_eq!(query.items_per_page(), DEFAULT_PER_PAGE);
        assert_eq!(query.offset(), 0);
        assert_eq!(query.sort_order(), SortOrder::Desc);

        let query = AuditQuery::new().with_page(0).with_per_page(5000);
        assert_eq!(query.page_number(), 1);
        assert_eq!(query.items_per_page(), MAX_PER_PAGE);

        let query = AuditQuery::new().with_page(3).with_per_page(25);
        assert_eq!(query.offset(), 50);
    }

    #[test]
    fn test_matches_actor_and_type() {
        let record = page_record(Some(Actor::new(1, "alice")), "About Us");
        assert!(AuditQuery::new().matches(&record));
        assert!(AuditQuery::new().with_actor(1).matches(&record));
        assert!(!AuditQuery::new().with_actor(2).matches(&record));
        assert!(AuditQuery::new()
            .with_entity_type("content.Page")
            .with_entity_id("1")
            .matches(&record));
        assert!(!AuditQuery::new()
            .with_entity_type("content.NewsItem")
            .matches(&record));
        assert!(!AuditQuery::new()
            .with_action(AuditAction::Delete)
            .matches(&record));
    }

    #[test]
    fn test_anonymous_record_never_matches_actor_filter() {
        let record = page_record(None, "About Us");
        assert!(!AuditQuery::new().with_actor(1).matches(&record));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let record = page_record(Some(Actor::new(1, "alice")), "About Us");
        assert!(AuditQuery::new().with_search("about").matches(&record));
        assert!(AuditQuery::new().with_search("ALICE").matches(&record));
        assert!(AuditQuery::new().with_search("updated").matches(&record));
        assert!(AuditQuery::new().with_search("content.page").matches(&record));
        assert!(AuditQuery::new().with_search("   ").matches(&record));
        assert!(!AuditQuery::new().with_search("tender").matches(&record));
    }

    #[test]
    fn test_time_window() {
        let record = page_record(None, "About Us");
        let mut query = AuditQuery::new();
        query.since = Some(record.created_at);
        query.until = Some(record.created_at);
        assert!(query.matches(&record));

        query.until = Some(record.created_at - Duration::seconds(1));
        assert!(!query.matches(&record));
    }

    #[test]
    fn test_query_string_shape() {
        let query: AuditQuery =
            serde_json::from_str(r#"{"action":"DELETE","order":"asc","per_page":5}"#).unwrap();
        assert_eq!(query.action, Some(AuditAction::Delete));
        assert_eq!(query.sort_order(), SortOrder::Asc);
        assert_eq!(query.items_per_page(), 5);
    }

    #[test]
    fn test_page_counts() {
        let page = AuditPage {
            records: Vec::new(),
            total: 41,
            page: 2,
            per_page: 20,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let empty = AuditPage {
            records: Vec::new(),
            total: 0,
            page: 1,
            per_page: 20,
        };
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next());
    }
}
