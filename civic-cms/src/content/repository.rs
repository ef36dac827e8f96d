//! Store of record for domain models
//!
//! [`Repository`] uses RPITIT (Return Position Impl Trait In Traits) for its
//! async methods, so implementations can be written with plain `async fn`.
//!
//! [`MemoryRepository`] keeps rows in memory and fires the audit hooks of an
//! attached [`ChangeInterceptor`]:
//!
//! | operation         | hook                                   |
//! |-------------------|----------------------------------------|
//! | `save` (no id)    | post-create                            |
//! | `save` (with id)  | post-update                            |
//! | `delete`          | pre-delete snapshot, then post-delete  |
//!
//! Hooks run after the row lock is released and never fail the operation.

use chrono::Utc;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::model::Model;
use crate::audit::ChangeInterceptor;
use crate::error::{Error, Result};

/// CRUD access to one model type
pub trait Repository<M: Model>: Send + Sync {
    /// Find a row by primary key
    fn find_by_id(&self, id: i64) -> impl Future<Output = Result<Option<M>>> + Send;

    /// Every row, in the model's listing order
    fn find_all(&self) -> impl Future<Output = Result<Vec<M>>> + Send;

    fn count(&self) -> impl Future<Output = Result<u64>> + Send;

    fn exists(&self, id: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Insert or update
    ///
    /// A model without an id is inserted and gets one assigned; a model with
    /// an id replaces the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when updating a row that does not exist.
    fn save(&self, model: M) -> impl Future<Output = Result<M>> + Send;

    /// Delete by primary key
    ///
    /// Returns `true` if a row was deleted, `false` if it didn't exist.
    fn delete(&self, id: i64) -> impl Future<Output = Result<bool>> + Send;
}

/// In-memory repository with audit hooks
pub struct MemoryRepository<M> {
    rows: RwLock<BTreeMap<i64, M>>,
    next_id: AtomicI64,
    interceptor: Option<ChangeInterceptor>,
}

impl<M: Model> MemoryRepository<M> {
    /// Repository without hooks
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            interceptor: None,
        }
    }

    /// Repository whose mutations go through `interceptor`
    pub fn with_interceptor(interceptor: ChangeInterceptor) -> Self {
        Self {
            interceptor: Some(interceptor),
            ..Self::new()
        }
    }

    pub fn interceptor(&self) -> Option<&ChangeInterceptor> {
        self.interceptor.as_ref()
    }
}

impl<M: Model> Default for MemoryRepository<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Repository<M> for MemoryRepository<M> {
    async fn find_by_id(&self, id: i64) -> Result<Option<M>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<M>> {
        let mut rows: Vec<M> = self.rows.read().await.values().cloned().collect();
        rows.sort_by(|a, b| a.listing_order(b));
        Ok(rows)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.read().await.len() as u64)
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        Ok(self.rows.read().await.contains_key(&id))
    }

    async fn save(&self, mut model: M) -> Result<M> {
        model.prepare();
        let now = Utc::now();

        let created = {
            let mut rows = self.rows.write().await;
            match model.id() {
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    model.set_id(id);
                    let meta = model.meta_mut();
                    meta.created_at = now;
                    meta.updated_at = now;
                    rows.insert(id, model.clone());
                    true
                }
                Some(id) => {
                    let Some(row) = rows.get_mut(&id) else {
                        return Err(Error::NotFound(format!("{} {}", M::ENTITY_TYPE, id)));
                    };
                    model.meta_mut().updated_at = now;
                    *row = model.clone();
                    false
                }
            }
        };

        tracing::debug!(
            entity_type = %M::ENTITY_TYPE,
            id = ?model.id(),
            created,
            "Saved"
        );

        if let Some(interceptor) = &self.interceptor {
            interceptor.post_save(&model, created).await;
        }

        Ok(model)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let captured = {
            let mut rows = self.rows.write().await;
            let Some(row) = rows.get(&id) else {
                return Ok(false);
            };
            let captured = self
                .interceptor
                .as_ref()
                .and_then(|interceptor| interceptor.pre_delete(row));
            rows.remove(&id);
            captured
        };

        tracing::debug!(entity_type = %M::ENTITY_TYPE, id, "Deleted");

        if let Some(interceptor) = &self.interceptor {
            interceptor.post_delete(captured).await;
        }

        Ok(true)
    }
}
