//! In-memory audit store

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AuditStore;
use crate::audit::query::{AuditPage, AuditQuery, SortOrder};
use crate::audit::record::AuditRecord;
use crate::error::Error;

/// Process-local audit store
///
/// Records are held in append order behind a `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Copy of every record, in append order
    pub async fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<(), Error> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<AuditPage, Error> {
        let records = self.records.read().await;

        let mut matching: Vec<&AuditRecord> =
            records.iter().filter(|r| query.matches(r)).collect();
        matching.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if query.sort_order() == SortOrder::Desc {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let per_page = query.items_per_page();

        Ok(AuditPage {
            records: matching
                .into_iter()
                .skip(offset)
                .take(per_page as usize)
                .cloned()
                .collect(),
            total,
            page: query.page_number(),
            per_page,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<AuditRecord>, Error> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn forget_actor(&self, actor_id: i64) -> Result<u64, Error> {
        let mut records = self.records.write().await;
        let mut affected = 0;
        for record in records.iter_mut() {
            if record.actor.as_ref().is_some_and(|a| a.id == actor_id) {
                record.actor = None;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::context::{Actor, RequestContext};
    use crate::audit::record::AuditAction;

    fn by(actor: Actor, action: AuditAction) -> AuditRecord {
        AuditRecord::new(action).with_context(&RequestContext::anonymous().with_actor(actor))
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let store = MemoryAuditStore::new();
        let record = by(Actor::new(1, "alice"), AuditAction::Create);
        store.append(&record).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(record.id).await.unwrap(), Some(record));
        assert_eq!(store.get(Uuid::now_v7()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_newest_first_with_pages() {
        let store = MemoryAuditStore::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let record = by(Actor::new(1, "alice"), AuditAction::Update);
            ids.push(record.id);
            store.append(&record).await.unwrap();
        }

        let page = store
            .query(&AuditQuery::new().with_per_page(2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].id, ids[4]);

        let last = store
            .query(&AuditQuery::new().with_per_page(2).with_page(3))
            .await
            .unwrap();
        assert_eq!(last.records.len(), 1);
        assert_eq!(last.records[0].id, ids[0]);

        let asc = store
            .query(&AuditQuery::new().with_order(SortOrder::Asc))
            .await
            .unwrap();
        assert_eq!(asc.records[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_forget_actor_keeps_records() {
        let store = MemoryAuditStore::new();
        store
            .append(&by(Actor::new(1, "alice"), AuditAction::Create))
            .await
            .unwrap();
        store
            .append(&by(Actor::new(1, "alice"), AuditAction::Update))
            .await
            .unwrap();
        store
            .append(&by(Actor::new(2, "bob"), AuditAction::Update))
            .await
            .unwrap();

        assert_eq!(store.forget_actor(1).await.unwrap(), 2);
        assert_eq!(store.len().await, 3);

        let records = store.snapshot().await;
        assert!(records[0].actor.is_none());
        assert!(records[1].actor.is_none());
        assert_eq!(records[2].actor_name(), Some("bob"));
        assert_eq!(store.forget_actor(1).await.unwrap(), 0);
    }
}
