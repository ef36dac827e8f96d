//! Read-only HTTP listing of the audit trail
//!
//! - `GET /audit-logs` takes [`AuditQuery`] as its query string and returns
//!   an [`AuditPage`]
//! - `GET /audit-logs/{id}` returns one record or 404

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::query::{AuditPage, AuditQuery};
use super::record::AuditRecord;
use crate::error::{Error, Result};
use crate::state::AppState;

/// Audit listing routes
pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/audit-logs", get(list_audit_records))
        .route("/audit-logs/{id}", get(get_audit_record))
}

async fn list_audit_records(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditPage>> {
    let page = state.audit_store().query(&query).await?;
    Ok(Json(page))
}

async fn get_audit_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditRecord>> {
    state
        .audit_store()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("audit record {}", id)))
}
