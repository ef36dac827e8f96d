//! PostgreSQL audit storage backend
//!
//! Principals are kept in `audit_actors`; each record references one through
//! `actor_id ... ON DELETE SET NULL`. A guard trigger rejects every DELETE on
//! `audit_records` and every UPDATE except that cascade clearing `actor_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::AuditStore;
use crate::audit::context::Actor;
use crate::audit::query::{AuditPage, AuditQuery};
use crate::audit::record::{AuditAction, AuditRecord};
use crate::error::Error;

const SELECT_RECORDS: &str = r#"
    SELECT r.id, r.created_at, r.actor_id, a.username AS actor_username,
           r.action, r.entity_type, r.entity_id, r.entity_repr,
           r.ip_address, r.user_agent, r.message, r.extra
    FROM audit_records r
    LEFT JOIN audit_actors a ON a.id = r.actor_id
"#;

/// PostgreSQL-backed audit store
#[derive(Clone, Debug)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    /// Create a new PostgreSQL audit store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables, indexes and the immutability guard
    ///
    /// Idempotent; called once at startup and by `civic audit init`.
    pub async fn initialize(&self) -> Result<(), Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_actors (
                id BIGINT PRIMARY KEY,
                username TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Audit(format!("Failed to create audit_actors table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_records (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                actor_id BIGINT REFERENCES audit_actors (id) ON DELETE SET NULL,
                action TEXT NOT NULL,
                entity_type TEXT NOT NULL DEFAULT '',
                entity_id TEXT NOT NULL DEFAULT '',
                entity_repr VARCHAR(255) NOT NULL DEFAULT '',
                ip_address TEXT,
                user_agent VARCHAR(255) NOT NULL DEFAULT '',
                message TEXT NOT NULL DEFAULT '',
                extra JSONB NOT NULL DEFAULT '{}'::jsonb
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Audit(format!("Failed to create audit_records table: {}", e)))?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_audit_records_created_at ON audit_records (created_at)",
            "CREATE INDEX IF NOT EXISTS idx_audit_records_actor ON audit_records (actor_id)",
            "CREATE INDEX IF NOT EXISTS idx_audit_records_action ON audit_records (action)",
            "CREATE INDEX IF NOT EXISTS idx_audit_records_entity ON audit_records (entity_type, entity_id)",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Audit(format!("Failed to create audit index: {}", e)))?;
        }

        sqlx::query(
            r#"
            CREATE OR REPLACE FUNCTION audit_records_guard() RETURNS trigger AS $$
            BEGIN
                IF TG_OP = 'UPDATE'
                   AND OLD.actor_id IS NOT NULL
                   AND NEW.actor_id IS NULL
                   AND (to_jsonb(NEW) - 'actor_id') = (to_jsonb(OLD) - 'actor_id') THEN
                    RETURN NEW;
                END IF;
                RAISE EXCEPTION 'audit_records is append-only (% rejected)', TG_OP;
            END
            $$ LANGUAGE plpgsql
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Audit(format!("Failed to create audit guard function: {}", e)))?;

        sqlx::query(
            r#"
            DO $$
            BEGIN
                IF NOT EXISTS (
                    SELECT 1 FROM pg_trigger WHERE tgname = 'audit_records_append_only'
                ) THEN
                    CREATE TRIGGER audit_records_append_only
                        BEFORE UPDATE OR DELETE ON audit_records
                        FOR EACH ROW EXECUTE FUNCTION audit_records_guard();
                END IF;
            END
            $$;
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Audit(format!("Failed to create audit guard trigger: {}", e)))?;

        Ok(())
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AuditQuery) {
        builder.push(" WHERE TRUE");

        if let Some(actor_id) = query.actor_id {
            builder.push(" AND r.actor_id = ").push_bind(actor_id);
        }
        if let Some(entity_type) = &query.entity_type {
            builder
                .push(" AND r.entity_type = ")
                .push_bind(entity_type.clone());
        }
        if let Some(entity_id) = &query.entity_id {
            builder
                .push(" AND r.entity_id = ")
                .push_bind(entity_id.clone());
        }
        if let Some(action) = query.action {
            builder.push(" AND r.action = ").push_bind(action.as_str());
        }
        if let Some(since) = query.since {
            builder.push(" AND r.created_at >= ").push_bind(since);
        }
        if let Some(until) = query.until {
            builder.push(" AND r.created_at <= ").push_bind(until);
        }
        if let Some(needle) = query.search_term() {
            let pattern = format!("%{}%", escape_like(needle));
            builder.push(" AND (");
            let mut columns = builder.separated(" OR ");
            for column in [
                "a.username",
                "r.entity_type",
                "r.entity_id",
                "r.entity_repr",
                "r.message",
                "r.ip_address",
                "r.user_agent",
            ] {
                columns
                    .push(format!("{column} ILIKE "))
                    .push_bind_unseparated(pattern.clone());
            }
            builder.push(")");
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<(), Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Audit(format!("Failed to begin audit transaction: {}", e)))?;

        if let Some(actor) = &record.actor {
            sqlx::query(
                r#"
                INSERT INTO audit_actors (id, username) VALUES ($1, $2)
                ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
                "#,
            )
            .bind(actor.id)
            .bind(&actor.username)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Audit(format!("Failed to upsert audit actor: {}", e)))?;
        }

        sqlx::query(
            r#"
            INSERT INTO audit_records (
                id, created_at, actor_id, action,
                entity_type, entity_id, entity_repr,
                ip_address, user_agent, message, extra
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(record.created_at)
        .bind(record.actor.as_ref().map(|a| a.id))
        .bind(record.action.as_str())
        .bind(&record.entity_type)
        .bind(&record.entity_id)
        .bind(&record.entity_repr)
        .bind(record.ip_address.map(|ip| ip.to_string()))
        .bind(&record.user_agent)
        .bind(&record.message)
        .bind(serde_json::Value::Object(record.extra.clone()))
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Audit(format!("Failed to append audit record: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Audit(format!("Failed to commit audit record: {}", e)))?;

        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<AuditPage, Error> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM audit_records r LEFT JOIN audit_actors a ON a.id = r.actor_id",
        );
        Self::push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Audit(format!("Failed to count audit records: {}", e)))?;

        let order = query.sort_order().as_sql();
        let mut select = QueryBuilder::<Postgres>::new(SELECT_RECORDS);
        Self::push_filters(&mut select, query);
        select
            .push(format!(" ORDER BY r.created_at {order}, r.id {order}"))
            .push(" LIMIT ")
            .push_bind(i64::from(query.items_per_page()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows: Vec<AuditRecordRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Audit(format!("Failed to query audit records: {}", e)))?;

        Ok(AuditPage {
            records: rows
                .into_iter()
                .map(AuditRecord::try_from)
                .collect::<Result<_, _>>()?,
            total: total.max(0) as u64,
            page: query.page_number(),
            per_page: query.items_per_page(),
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<AuditRecord>, Error> {
        let row: Option<AuditRecordRow> =
            sqlx::query_as(&format!("{SELECT_RECORDS} WHERE r.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Audit(format!("Failed to fetch audit record: {}", e)))?;

        row.map(AuditRecord::try_from).transpose()
    }

    async fn forget_actor(&self, actor_id: i64) -> Result<u64, Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Audit(format!("Failed to begin audit transaction: {}", e)))?;

        // Appends naming this actor take a key-share lock on its row, so they
        // wait here until commit and the count stays exact.
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM audit_actors WHERE id = $1 FOR UPDATE")
                .bind(actor_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| Error::Audit(format!("Failed to lock audit actor: {}", e)))?;
        if locked.is_none() {
            return Ok(0);
        }

        let affected: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_records WHERE actor_id = $1")
                .bind(actor_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| Error::Audit(format!("Failed to count actor records: {}", e)))?;

        // ON DELETE SET NULL clears the references
        sqlx::query("DELETE FROM audit_actors WHERE id = $1")
            .bind(actor_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Audit(format!("Failed to remove audit actor: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Audit(format!("Failed to commit actor removal: {}", e)))?;

        Ok(affected.max(0) as u64)
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct AuditRecordRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    actor_id: Option<i64>,
    actor_username: Option<String>,
    action: String,
    entity_type: String,
    entity_id: String,
    entity_repr: String,
    ip_address: Option<String>,
    user_agent: String,
    message: String,
    extra: serde_json::Value,
}

impl TryFrom<AuditRecordRow> for AuditRecord {
    type Error = Error;

    fn try_from(row: AuditRecordRow) -> Result<Self, Self::Error> {
        let action: AuditAction = row
            .action
            .parse()
            .map_err(|e| Error::Audit(format!("Corrupt audit record {}: {}", row.id, e)))?;

        let actor = match (row.actor_id, row.actor_username) {
            (Some(id), Some(username)) => Some(Actor { id, username }),
            _ => None,
        };

        let extra = match row.extra {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        Ok(AuditRecord {
            id: row.id,
            created_at: row.created_at,
            actor,
            action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            entity_repr: row.entity_repr,
            ip_address: row.ip_address.and_then(|ip| ip.parse().ok()),
            user_agent: row.user_agent,
            message: row.message,
            extra,
        })
    }
}
