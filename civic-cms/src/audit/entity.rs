//! Entity references for audit records
//!
//! Audit records point at entities through a `(type label, id, display)`
//! triple rather than a foreign key, so history outlives the referenced row
//! and any later restructuring of its table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum stored display-string length, in characters
pub const ENTITY_REPR_MAX_LEN: usize = 255;

/// Stable type descriptor for an audited entity
///
/// The label (`app_label.Model`) is what gets persisted; it must never be
/// derived from storage details such as table names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityType {
    /// Owning application, e.g. `content`
    pub app_label: &'static str,
    /// Model name, e.g. `Page`
    pub model: &'static str,
}

impl EntityType {
    /// Create a descriptor
    pub const fn new(app_label: &'static str, model: &'static str) -> Self {
        Self { app_label, model }
    }

    /// Persisted label, e.g. `content.Page`
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model)
    }

    /// Whether the descriptor carries usable metadata
    pub fn is_resolved(&self) -> bool {
        !self.app_label.is_empty() && !self.model.is_empty()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model)
    }
}

/// Why an entity could not produce its display string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReprError {
    /// The field the display string is built from is blank
    #[error("{0} is blank")]
    Blank(&'static str),
    /// Any other degenerate state
    #[error("{0}")]
    Invalid(String),
}

/// Capability of being referenced from the audit log
pub trait Auditable {
    /// Type descriptor shared by every instance
    const ENTITY_TYPE: EntityType;

    /// Primary identifier, if the entity has one
    fn audit_id(&self) -> Option<String>;

    /// Human-readable display string
    fn audit_repr(&self) -> Result<String, ReprError>;
}

/// Type-qualified reference to an entity, captured at event time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Stable type label
    pub entity_type: String,
    /// String form of the identifier, empty when unavailable
    pub entity_id: String,
    /// Bounded display snapshot
    pub entity_repr: String,
}

/// Resolve the audit reference of an entity
///
/// Returns `None` when the entity type has unresolved metadata. A failing
/// display string is replaced by `label#id` (or the bare label without an
/// id) and never propagated.
pub fn resolve<E: Auditable>(entity: &E) -> Option<EntityRef> {
    let entity_type = E::ENTITY_TYPE;
    if !entity_type.is_resolved() {
        return None;
    }

    let label = entity_type.label();
    let entity_id = entity.audit_id().unwrap_or_default();

    let repr = match entity.audit_repr() {
        Ok(repr) => repr,
        Err(e) => {
            tracing::debug!(
                entity_type = %label,
                entity_id = %entity_id,
                error = %e,
                "Display string unavailable, using fallback"
            );
            fallback_repr(&label, &entity_id)
        }
    };

    Some(EntityRef {
        entity_type: label,
        entity_id,
        entity_repr: truncate(&repr, ENTITY_REPR_MAX_LEN),
    })
}

fn fallback_repr(label: &str, entity_id: &str) -> String {
    if entity_id.is_empty() {
        label.to_string()
    } else {
        format!("{}#{}", label, entity_id)
    }
}

pub(crate) fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget {
        id: Option<i64>,
        name: String,
    }

    impl Auditable for Widget {
        const ENTITY_TYPE: EntityType = EntityType::new("inventory", "Widget");

        fn audit_id(&self) -> Option<String> {
            self.id.map(|id| id.to_string())
        }

        fn audit_repr(&self) -> Result<String, ReprError> {
            if self.name.is_empty() {
                return Err(ReprError::Blank("name"));
            }
            Ok(self.name.clone())
        }
    }

    struct Orphan;

    impl Auditable for Orphan {
        const ENTITY_TYPE: EntityType = EntityType::new("", "Orphan");

        fn audit_id(&self) -> Option<String> {
            Some("1".to_string())
        }

        fn audit_repr(&self) -> Result<String, ReprError> {
            Ok("orphan".to_string())
        }
    }

    #[test]
    fn test_resolve_uses_label_id_and_display() {
        let widget = Widget {
            id: Some(7),
            name: "Sprocket".to_string(),
        };
        let reference = resolve(&widget).unwrap();
        assert_eq!(reference.entity_type, "inventory.Widget");
        assert_eq!(reference.entity_id, "7");
        assert_eq!(reference.entity_repr, "Sprocket");
    }

    #[test]
    fn test_resolve_without_id_is_empty_string() {
        let widget = Widget {
            id: None,
            name: "Sprocket".to_string(),
        };
        assert_eq!(resolve(&widget).unwrap().entity_id, "");
    }

    #[test]
    fn test_failing_display_falls_back_to_label_and_id() {
        let widget = Widget {
            id: Some(3),
            name: String::new(),
        };
        assert_eq!(resolve(&widget).unwrap().entity_repr, "inventory.Widget#3");

        let widget = Widget {
            id: None,
            name: String::new(),
        };
        assert_eq!(resolve(&widget).unwrap().entity_repr, "inventory.Widget");
    }

    #[test]
    fn test_repr_is_bounded() {
        let widget = Widget {
            id: Some(1),
            name: "x".repeat(1000),
        };
        assert_eq!(
            resolve(&widget).unwrap().entity_repr.chars().count(),
            ENTITY_REPR_MAX_LEN
        );
    }

    #[test]
    fn test_unresolved_metadata_yields_nothing() {
        assert!(resolve(&Orphan).is_none());
        assert!(!Orphan::ENTITY_TYPE.is_resolved());
    }

    #[test]
    fn test_entity_type_display() {
        assert_eq!(Widget::ENTITY_TYPE.to_string(), "inventory.Widget");
        assert_eq!(Widget::ENTITY_TYPE.label(), "inventory.Widget");
    }
}
