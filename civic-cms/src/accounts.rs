//! Institutional users and their sign-in audit records

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::writer::USER_ENTITY;
use crate::audit::{Actor, AuditAction, AuditStore, AuditWriter, Auditable, EntityType, ReprError};
use crate::error::Result;

/// Role used for policy decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    ContentEditor,
    #[default]
    DepartmentOfficer,
}

impl UserRole {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin (ICT/Admin)",
            Self::ContentEditor => "Content Editor",
            Self::DepartmentOfficer => "Department Officer",
        }
    }
}

/// Government institutional user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_name(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    /// First and last name, trimmed; empty when neither is set
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Reference used to attribute audit records to this user
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, &self.username)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = self.full_name();
        if full_name.is_empty() {
            f.write_str(&self.username)
        } else {
            f.write_str(&full_name)
        }
    }
}

impl Auditable for User {
    const ENTITY_TYPE: EntityType = USER_ENTITY;

    fn audit_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }

    fn audit_repr(&self) -> std::result::Result<String, ReprError> {
        let display = self.to_string();
        if display.trim().is_empty() {
            return Err(ReprError::Blank("username"));
        }
        Ok(display)
    }
}

/// Record a LOGIN for `user`
pub async fn record_login(writer: &AuditWriter, user: &User) {
    tracing::info!(user_id = user.id, username = %user.username, "User logged in");
    writer
        .log_auth(AuditAction::Login, &user.actor(), &user.to_string())
        .await;
}

/// Record a LOGOUT for `user`
pub async fn record_logout(writer: &AuditWriter, user: &User) {
    tracing::info!(user_id = user.id, username = %user.username, "User logged out");
    writer
        .log_auth(AuditAction::Logout, &user.actor(), &user.to_string())
        .await;
}

/// Detach a removed user from their audit history
///
/// The records stay; their actor becomes absent. Returns how many records
/// were affected.
pub async fn remove_user(store: &dyn AuditStore, user: &User) -> Result<u64> {
    let affected = store.forget_actor(user.id).await?;
    tracing::info!(
        user_id = user.id,
        records = affected,
        "User removed, audit history detached"
    );
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::context::{self, RequestContext};
    use crate::audit::{AuditQuery, MemoryAuditStore, TrackedEntitySet};
    use std::sync::Arc;

    #[test]
    fn test_display_prefers_full_name() {
        let user = User::new(1, "alice");
        assert_eq!(user.to_string(), "alice");

        let user = user.with_name("Alice", "Wanjiru");
        assert_eq!(user.to_string(), "Alice Wanjiru");
        assert_eq!(user.role, UserRole::DepartmentOfficer);
    }

    #[test]
    fn test_users_are_not_tracked() {
        assert_eq!(User::ENTITY_TYPE.label(), "accounts.User");
        assert!(!TrackedEntitySet::institutional().contains(&User::ENTITY_TYPE));
    }

    #[test]
    fn test_role_serialization() {
        let role = serde_json::to_value(UserRole::SuperAdmin).unwrap();
        assert_eq!(role, "SUPER_ADMIN");
        assert_eq!(UserRole::ContentEditor.label(), "Content Editor");
    }

    #[tokio::test]
    async fn test_login_and_logout_records() {
        let store = Arc::new(MemoryAuditStore::new());
        let writer = AuditWriter::inline(store.clone());
        let alice = User::new(1, "alice").with_name("Alice", "Wanjiru");

        let ctx = RequestContext::from_request(None, Some("198.51.100.7"), Some("Firefox"), None);
        context::scope(ctx, async {
            record_login(&writer, &alice).await;
            record_logout(&writer, &alice).await;
        })
        .await;

        let records = store.snapshot().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, AuditAction::Login);
        assert_eq!(records[1].action, AuditAction::Logout);
        for record in &records {
            assert_eq!(record.entity_type, "accounts.User");
            assert_eq!(record.entity_id, "1");
            assert_eq!(record.entity_repr, "Alice Wanjiru");
            assert_eq!(record.actor_name(), Some("alice"));
            assert_eq!(record.user_agent, "Firefox");
        }
    }

    #[tokio::test]
    async fn test_login_is_attributed_to_the_user_not_the_scope() {
        let store = Arc::new(MemoryAuditStore::new());
        let writer = AuditWriter::inline(store.clone());
        let alice = User::new(1, "alice");
        let bob = User::new(2, "bob");

        let ctx = RequestContext::from_request(
            Some(bob.actor()),
            Some("198.51.100.7"),
            Some("Firefox"),
            None,
        );
        context::scope(ctx, record_login(&writer, &alice)).await;

        let record = &store.snapshot().await[0];
        assert_eq!(record.entity_id, "1");
        assert_eq!(record.actor_name(), Some("alice"));
        assert_eq!(record.actor.as_ref().map(|a| a.id), Some(1));
        assert_eq!(record.ip_address, Some("198.51.100.7".parse().unwrap()));
        assert_eq!(record.user_agent, "Firefox");
    }

    #[tokio::test]
    async fn test_remove_user_keeps_records() {
        let store = Arc::new(MemoryAuditStore::new());
        let writer = AuditWriter::inline(store.clone());
        let alice = User::new(1, "alice");
        let bob = User::new(2, "bob");

        record_login(&writer, &alice).await;
        record_login(&writer, &bob).await;

        let affected = remove_user(store.as_ref(), &alice).await.unwrap();
        assert_eq!(affected, 1);

        let page = store.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(
            store
                .query(&AuditQuery::default().with_actor(1))
                .await
                .unwrap()
                .total,
            0
        );
        assert!(page.records.iter().any(|r| r.actor.is_none() && r.entity_id == "1"));
    }
}
