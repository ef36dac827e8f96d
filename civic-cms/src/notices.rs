//! Public notices

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::content::model::{
    auditable, by_publication, ensure_slug, publishable, record_accessors, LONG_SLUG_LEN,
};
use crate::content::{Lifecycle, Model, Publishable, RecordMeta};

/// Official notice, optionally with an attached file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub body: String,
    /// Stored file name of the attachment
    pub attachment: Option<String>,
    pub lifecycle: Lifecycle,
    pub meta: RecordMeta,
}

impl Notice {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

auditable!(Notice, "notices", "Notice", title);
publishable!(Notice);

impl Model for Notice {
    record_accessors!();

    fn prepare(&mut self) {
        ensure_slug(&mut self.slug, &self.title, LONG_SLUG_LEN);
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        by_publication(
            (self.published_at(), &self.meta),
            (other.published_at(), &other.meta),
        )
    }
}
