//! Downloadable documents: forms, reports, policies and tenders

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::content::model::{auditable, by_publication, publishable, record_accessors};
use crate::content::{Lifecycle, Model, Publishable, RecordMeta};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    Forms,
    Reports,
    Policies,
    Tenders,
    #[default]
    Other,
}

impl DocumentCategory {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Forms => "Forms",
            Self::Reports => "Reports",
            Self::Policies => "Policies",
            Self::Tenders => "Tenders",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Published file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<i64>,
    pub title: String,
    pub category: DocumentCategory,
    /// Owning department, if any
    pub department_id: Option<i64>,
    pub description: String,
    /// Stored file name
    pub file_name: String,
    pub lifecycle: Lifecycle,
    pub meta: RecordMeta,
}

impl Document {
    pub fn new(
        title: impl Into<String>,
        category: DocumentCategory,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category,
            file_name: file_name.into(),
            ..Self::default()
        }
    }
}

auditable!(Document, "downloads", "Document", title);
publishable!(Document);

impl Model for Document {
    record_accessors!();

    fn listing_order(&self, other: &Self) -> Ordering {
        by_publication(
            (self.published_at(), &self.meta),
            (other.published_at(), &other.meta),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{
        AuditAction, AuditWriter, ChangeInterceptor, MemoryAuditStore, TrackedEntitySet,
    };
    use crate::content::{publish_selected, MemoryRepository, Repository};
    use std::sync::Arc;

    #[test]
    fn test_default_category() {
        let document = Document::default();
        assert_eq!(document.category, DocumentCategory::Other);
        assert_eq!(
            serde_json::to_value(DocumentCategory::Tenders).unwrap(),
            "TENDERS"
        );
    }

    #[tokio::test]
    async fn test_document_changes_are_audited() {
        let store = Arc::new(MemoryAuditStore::new());
        let interceptor = ChangeInterceptor::new(
            TrackedEntitySet::institutional(),
            AuditWriter::inline(store.clone()),
        );
        let documents = MemoryRepository::with_interceptor(interceptor);

        let saved = documents
            .save(Document::new(
                "Annual Report 2024",
                DocumentCategory::Reports,
                "annual-report-2024.pdf",
            ))
            .await
            .unwrap();
        publish_selected(&documents, &[saved.id.unwrap()], 2)
            .await
            .unwrap();

        let records = store.snapshot().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, AuditAction::Create);
        assert_eq!(records[1].action, AuditAction::Update);
        assert!(records.iter().all(|r| {
            r.entity_type == "downloads.Document" && r.entity_repr == "Annual Report 2024"
        }));
    }
}
