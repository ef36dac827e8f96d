//! Application state management

use std::sync::Arc;

#[cfg(feature = "database")]
use sqlx::PgPool;

use crate::audit::{AuditStore, AuditWriter, ChangeInterceptor, MemoryAuditStore, TrackedEntitySet};
use crate::{config::Config, error::Result};

/// Application state shared across handlers
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    writer: AuditWriter,
    interceptor: ChangeInterceptor,

    #[cfg(feature = "database")]
    db_pool: Option<PgPool>,
}

impl AppState {
    /// Create state over an existing audit store
    ///
    /// The writer follows `config.audit`; the interceptor tracks the
    /// institutional entity set.
    pub fn new(config: Config, store: Arc<dyn AuditStore>) -> Self {
        let writer = AuditWriter::new(store, &config.audit, config.service.name.clone());
        let interceptor = ChangeInterceptor::new(TrackedEntitySet::institutional(), writer.clone());

        Self {
            config: Arc::new(config),
            writer,
            interceptor,
            #[cfg(feature = "database")]
            db_pool: None,
        }
    }

    /// Build state from configuration
    ///
    /// With a `[database]` section (and the `database` feature) the audit log
    /// goes to PostgreSQL, whose schema is created if missing. Otherwise it is
    /// kept in memory.
    pub async fn from_config(config: Config) -> Result<Self> {
        #[cfg(feature = "database")]
        if let Some(db_config) = &config.database {
            let pool = crate::database::create_pool(db_config).await?;
            let store = crate::audit::PgAuditStore::new(pool.clone());
            store.initialize().await?;

            let mut state = Self::new(config, Arc::new(store));
            state.db_pool = Some(pool);
            return Ok(state);
        }

        #[cfg(not(feature = "database"))]
        if config.database.is_some() {
            tracing::warn!(
                "Database configured but the `database` feature is off; audit log kept in memory"
            );
        }

        tracing::info!("Using in-memory audit store");
        Ok(Self::new(config, Arc::new(MemoryAuditStore::new())))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn writer(&self) -> &AuditWriter {
        &self.writer
    }

    /// Interceptor to attach to repositories of tracked models
    pub fn interceptor(&self) -> &ChangeInterceptor {
        &self.interceptor
    }

    pub fn audit_store(&self) -> &Arc<dyn AuditStore> {
        self.writer.store()
    }

    /// Get the database pool, if one was created
    #[cfg(feature = "database")]
    pub fn db(&self) -> Option<&PgPool> {
        self.db_pool.as_ref()
    }
}
