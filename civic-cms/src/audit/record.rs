//! Audit record types
//!
//! An [`AuditRecord`] is write-once: it is built, stamped by the writer and
//! appended. Nothing in this crate mutates a stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use uuid::Uuid;

use super::context::{Actor, RequestContext};
use super::entity::{truncate, EntityRef, EntityType, ENTITY_REPR_MAX_LEN};

/// A single entry in the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier (UUIDv7, time-ordered)
    pub id: Uuid,
    /// Creation time; non-decreasing per writer
    pub created_at: DateTime<Utc>,
    /// Acting principal; `None` for anonymous or system changes, or once the
    /// principal has been removed
    pub actor: Option<Actor>,
    /// What happened
    pub action: AuditAction,
    /// Stable type label, e.g. `content.Page`
    pub entity_type: String,
    /// String form of the entity id, empty if unavailable
    pub entity_id: String,
    /// Bounded display snapshot of the entity at event time
    pub entity_repr: String,
    /// Client address
    pub ip_address: Option<IpAddr>,
    /// Client user agent, empty if unknown
    pub user_agent: String,
    /// Free text
    pub message: String,
    /// Event-specific detail
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuditRecord {
    /// Create a record for the given action, with no entity or context
    pub fn new(action: AuditAction) -> Self {
        Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            actor: None,
            action,
            entity_type: String::new(),
            entity_id: String::new(),
            entity_repr: String::new(),
            ip_address: None,
            user_agent: String::new(),
            message: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Attribute the record to a request context
    pub fn with_context(mut self, ctx: &RequestContext) -> Self {
        self.actor = ctx.actor.clone();
        self.ip_address = ctx.ip_address;
        self.user_agent = ctx.user_agent.clone().unwrap_or_default();
        self
    }

    /// Point the record at an entity
    pub fn with_entity(mut self, entity: EntityRef) -> Self {
        self.entity_type = entity.entity_type;
        self.entity_id = entity.entity_id;
        self.entity_repr = truncate(&entity.entity_repr, ENTITY_REPR_MAX_LEN);
        self
    }

    /// Point the record at an entity described by type and id only
    pub fn with_target(
        mut self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_repr: &str,
    ) -> Self {
        self.entity_type = entity_type.label();
        self.entity_id = entity_id.into();
        self.entity_repr = truncate(entity_repr, ENTITY_REPR_MAX_LEN);
        self
    }

    /// Set the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add a key to the extra payload
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Actor username, if any
    pub fn actor_name(&self) -> Option<&str> {
        self.actor.as_ref().map(|a| a.username.as_str())
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.created_at.to_rfc3339(),
            self.action,
            self.entity_type,
            self.entity_id
        )
    }
}

/// Kinds of audited events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Entity created
    Create,
    /// Entity updated, including lifecycle transitions
    Update,
    /// Entity deleted
    Delete,
    /// User signed in
    Login,
    /// User signed out
    Logout,
}

impl AuditAction {
    /// All actions, in declaration order
    pub const ALL: [AuditAction; 5] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::Login,
        Self::Logout,
    ];

    /// Persisted form
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown action name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown audit action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for AuditAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_blank() {
        let record = AuditRecord::new(AuditAction::Create);
        assert_eq!(record.action, AuditAction::Create);
        assert!(record.actor.is_none());
        assert!(record.entity_id.is_empty());
        assert!(record.user_agent.is_empty());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_with_context_copies_values() {
        let ctx = RequestContext::anonymous()
            .with_actor(Actor::new(1, "alice"))
            .with_ip("203.0.113.5".parse().unwrap())
            .with_user_agent("Mozilla/5.0");

        let record = AuditRecord::new(AuditAction::Update).with_context(&ctx);
        assert_eq!(record.actor_name(), Some("alice"));
        assert_eq!(record.ip_address, Some("203.0.113.5".parse().unwrap()));
        assert_eq!(record.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn test_with_entity_and_extra() {
        let record = AuditRecord::new(AuditAction::Delete)
            .with_entity(EntityRef {
                entity_type: "content.Page".to_string(),
                entity_id: "7".to_string(),
                entity_repr: "About".to_string(),
            })
            .with_message("Deleted")
            .with_extra("bulk", serde_json::json!(true));

        assert_eq!(record.entity_type, "content.Page");
        assert_eq!(record.entity_id, "7");
        assert_eq!(record.entity_repr, "About");
        assert_eq!(record.message, "Deleted");
        assert_eq!(record.extra["bulk"], serde_json::json!(true));
    }

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::Create.to_string(), "CREATE");
        assert_eq!("logout".parse::<AuditAction>().unwrap(), AuditAction::Logout);
        assert_eq!(" UPDATE ".parse::<AuditAction>().unwrap(), AuditAction::Update);
        assert!("PUBLISH".parse::<AuditAction>().is_err());
        assert_eq!(
            serde_json::to_string(&AuditAction::Delete).unwrap(),
            "\"DELETE\""
        );
    }

    #[test]
    fn test_record_ids_are_time_ordered() {
        let first = AuditRecord::new(AuditAction::Create);
        let second = AuditRecord::new(AuditAction::Create);
        assert!(first.id < second.id);
    }
}
