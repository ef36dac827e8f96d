//! Persistence-facing model contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::audit::{Auditable, ReprError};

/// Slug length for departments, services and pages
pub const SHORT_SLUG_LEN: usize = 220;

/// Slug length for news, careers and notices
pub const LONG_SLUG_LEN: usize = 255;

/// Timestamps and author tracking carried by every model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// User id of the creator; cleared if that user is removed
    pub created_by: Option<i64>,
    /// User id of the last editor; cleared if that user is removed
    pub updated_by: Option<i64>,
}

impl Default for RecordMeta {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }
}

/// A row in the store of record
///
/// Every model is [`Auditable`]; whether its changes are actually recorded
/// is decided by the tracked set, not by the model.
pub trait Model: Auditable + Clone + Send + Sync + 'static {
    /// Primary key, `None` until first saved
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Normalize fields before a save (derive slugs and the like)
    fn prepare(&mut self) {}

    /// Listing order
    fn listing_order(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

/// Fill `slug` from `source` when it is blank
pub fn ensure_slug(slug: &mut String, source: &str, max_len: usize) {
    if slug.trim().is_empty() {
        *slug = slugify(source, max_len);
    }
}

/// URL slug: lowercase ASCII words joined by hyphens, at most `max_len` long
///
/// Letters are transliterated to ASCII first ("Café" becomes "cafe"). What
/// is then left outside `[A-Za-z0-9_-]` and whitespace is dropped.
pub fn slugify(value: &str, max_len: usize) -> String {
    let ascii = deunicode::deunicode(value);
    let mut slug = String::with_capacity(ascii.len());
    let mut separator = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if separator && !slug.is_empty() {
                slug.push('-');
            }
            separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            separator = true;
        }
    }

    slug.truncate(max_len);
    slug
}

/// Display string built from a required text field
pub(crate) fn display_field(field: &'static str, value: &str) -> Result<String, ReprError> {
    if value.trim().is_empty() {
        return Err(ReprError::Blank(field));
    }
    Ok(value.to_string())
}

/// Implement [`Auditable`] for a model with an `id: Option<i64>` field,
/// displayed by one of its text fields
macro_rules! auditable {
    ($ty:ty, $app:literal, $model:literal, $display:ident) => {
        impl $crate::audit::Auditable for $ty {
            const ENTITY_TYPE: $crate::audit::EntityType =
                $crate::audit::EntityType::new($app, $model);

            fn audit_id(&self) -> Option<String> {
                self.id.map(|id| id.to_string())
            }

            fn audit_repr(&self) -> Result<String, $crate::audit::ReprError> {
                $crate::content::model::display_field(stringify!($display), &self.$display)
            }
        }
    };
}

/// Implement [`Model`] accessors for a struct with `id` and `meta` fields
macro_rules! record_accessors {
    () => {
        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }

        fn meta(&self) -> &$crate::content::RecordMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut $crate::content::RecordMeta {
            &mut self.meta
        }
    };
}

/// Implement [`Publishable`](super::Publishable) for a struct with a
/// `lifecycle` field
macro_rules! publishable {
    ($ty:ty) => {
        impl $crate::content::Publishable for $ty {
            fn lifecycle(&self) -> &$crate::content::Lifecycle {
                &self.lifecycle
            }

            fn lifecycle_mut(&mut self) -> &mut $crate::content::Lifecycle {
                &mut self.lifecycle
            }
        }
    };
}

pub(crate) use {auditable, publishable, record_accessors};

/// Newest publication first, unpublished last, then newest creation first
pub(crate) fn by_publication(
    a: (Option<DateTime<Utc>>, &RecordMeta),
    b: (Option<DateTime<Utc>>, &RecordMeta),
) -> Ordering {
    b.0.cmp(&a.0)
        .then_with(|| b.1.created_at.cmp(&a.1.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("About Us", 220), "about-us");
        assert_eq!(slugify("  Fees & Charges -- 2025 ", 220), "fees-charges-2025");
        assert_eq!(slugify("Café résumé", 220), "cafe-resume");
        assert_eq!(slugify("Ministère de la Santé", 220), "ministere-de-la-sante");
        assert_eq!(slugify("snake_case stays", 220), "snake_case-stays");
        assert_eq!(slugify("", 220), "");
    }

    #[test]
    fn test_slugify_truncates() {
        let slug = slugify(&"word ".repeat(100), SHORT_SLUG_LEN);
        assert_eq!(slug.len(), SHORT_SLUG_LEN);
    }

    #[test]
    fn test_display_field() {
        assert_eq!(display_field("title", "About").unwrap(), "About");
        assert_eq!(
            display_field("title", "   ").unwrap_err(),
            ReprError::Blank("title")
        );
    }

    #[test]
    fn test_ensure_slug_keeps_existing() {
        let mut slug = "custom".to_string();
        ensure_slug(&mut slug, "Title", LONG_SLUG_LEN);
        assert_eq!(slug, "custom");

        let mut slug = String::new();
        ensure_slug(&mut slug, "Public Tender 12", LONG_SLUG_LEN);
        assert_eq!(slug, "public-tender-12");
    }
}
