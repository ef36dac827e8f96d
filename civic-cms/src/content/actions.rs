//! Admin bulk actions on publishable content

use chrono::Utc;

use super::lifecycle::Publishable;
use super::model::Model;
use super::repository::Repository;
use crate::error::Result;

/// Record `editor_id` as the author of a change
///
/// The creator is only set once; the last editor is always overwritten.
pub fn stamp_author<M: Model>(model: &mut M, editor_id: i64) {
    let meta = model.meta_mut();
    meta.created_by.get_or_insert(editor_id);
    meta.updated_by = Some(editor_id);
}

/// Publish every selected row
///
/// Each item is saved on its own and so produces its own UPDATE record.
/// Ids with no row are skipped. Returns the number of rows published.
pub async fn publish_selected<M, R>(repo: &R, ids: &[i64], editor_id: i64) -> Result<usize>
where
    M: Model + Publishable,
    R: Repository<M>,
{
    transition_selected(repo, ids, editor_id, Transition::Publish).await
}

/// Archive every selected row
///
/// Same contract as [`publish_selected`].
pub async fn archive_selected<M, R>(repo: &R, ids: &[i64], editor_id: i64) -> Result<usize>
where
    M: Model + Publishable,
    R: Repository<M>,
{
    transition_selected(repo, ids, editor_id, Transition::Archive).await
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Publish,
    Archive,
}

async fn transition_selected<M, R>(
    repo: &R,
    ids: &[i64],
    editor_id: i64,
    transition: Transition,
) -> Result<usize>
where
    M: Model + Publishable,
    R: Repository<M>,
{
    let now = Utc::now();
    let mut changed = 0;

    for &id in ids {
        let Some(mut item) = repo.find_by_id(id).await? else {
            tracing::debug!(entity_type = %M::ENTITY_TYPE, id, "Selected row missing, skipped");
            continue;
        };

        match transition {
            Transition::Publish => item.lifecycle_mut().publish_at(now),
            Transition::Archive => item.lifecycle_mut().archive_at(now),
        }
        // the creator stays whoever created the row
        item.meta_mut().updated_by = Some(editor_id);
        repo.save(item).await?;
        changed += 1;
    }

    tracing::info!(
        entity_type = %M::ENTITY_TYPE,
        transition = ?transition,
        selected = ids.len(),
        changed,
        "Bulk action applied"
    );
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{
        AuditAction, AuditWriter, ChangeInterceptor, MemoryAuditStore, TrackedEntitySet,
    };
    use crate::content::{Department, MemoryRepository, NewsItem, PublishStatus};
    use std::sync::Arc;

    #[test]
    fn test_stamp_author() {
        let mut department = Department::new("Health");
        stamp_author(&mut department, 3);
        assert_eq!(department.meta.created_by, Some(3));
        assert_eq!(department.meta.updated_by, Some(3));

        stamp_author(&mut department, 5);
        assert_eq!(department.meta.created_by, Some(3));
        assert_eq!(department.meta.updated_by, Some(5));
    }

    #[tokio::test]
    async fn test_publish_selected() {
        let store = Arc::new(MemoryAuditStore::new());
        let interceptor = ChangeInterceptor::new(
            TrackedEntitySet::institutional(),
            AuditWriter::inline(store.clone()),
        );
        let news = MemoryRepository::with_interceptor(interceptor);

        let first = news.save(NewsItem::new("Budget", "...")).await.unwrap();
        let second = news.save(NewsItem::new("Tender", "...")).await.unwrap();
        let ids = [first.id.unwrap(), 99, second.id.unwrap()];

        let published = publish_selected(&news, &ids, 7).await.unwrap();
        assert_eq!(published, 2);

        for item in news.find_all().await.unwrap() {
            assert_eq!(item.status(), PublishStatus::Published);
            assert!(item.published_at().is_some());
            assert_eq!(item.meta.updated_by, Some(7));
            assert_eq!(item.meta.created_by, None);
        }

        let updates = store
            .snapshot()
            .await
            .into_iter()
            .filter(|r| r.action == AuditAction::Update)
            .count();
        assert_eq!(updates, 2);
    }

    #[tokio::test]
    async fn test_archive_selected() {
        let news = MemoryRepository::<NewsItem>::new();
        let mut item = NewsItem::new("Old notice", "...");
        stamp_author(&mut item, 2);
        item.publish();
        let item = news.save(item).await.unwrap();
        let published_at = item.published_at();

        let archived = archive_selected(&news, &[item.id.unwrap()], 1).await.unwrap();
        assert_eq!(archived, 1);

        let item = news.find_by_id(item.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(item.status(), PublishStatus::Archived);
        assert!(item.archived_at().is_some());
        assert_eq!(item.published_at(), published_at);
        assert_eq!(item.meta.created_by, Some(2));
        assert_eq!(item.meta.updated_by, Some(1));
    }
}
