use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::shared::models::{ActionType, AuditLog};
use crate::shared::schema::audit_logs;
use crate::shared::state::AppState;

pub const ACTOR_USER: &str = "user";
pub const ACTOR_VENDOR: &str = "vendor";

pub struct AuditEntry {
    pub vendor_id: Option<Uuid>,
    pub vendor_document_id: Option<Uuid>,
    pub action_type: ActionType,
    pub actor_id: Option<Uuid>,
    pub actor_type: &'static str,
    pub description: String,
}

/// Append one audit row. The sink is fire-and-forget: a failed insert is
/// logged and never fails the operation that produced it.
pub fn record(conn: &mut PgConnection, entry: AuditEntry) {
    let log = AuditLog {
        id: Uuid::new_v4(),
        vendor_document_id: entry.vendor_document_id,
        vendor_id: entry.vendor_id,
        action_type: entry.action_type.to_string(),
        actor_id: entry.actor_id,
        actor_type: entry.actor_type.to_string(),
        description: entry.description,
        metadata: None,
        created_at: Utc::now(),
    };

    if let Err(e) = diesel::insert_into(audit_logs::table)
        .values(&log)
        .execute(conn)
    {
        tracing::warn!("failed to write audit log ({}): {}", log.action_type, e);
    }
}

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub vendor_id: Option<Uuid>,
    pub vendor_document_id: Option<Uuid>,
}

pub async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLog>>, ApiError> {
    let mut conn = state.conn.get()?;

    let mut q = audit_logs::table.into_boxed();
    if let Some(vendor_id) = query.vendor_id {
        q = q.filter(audit_logs::vendor_id.eq(vendor_id));
    }
    if let Some(document_id) = query.vendor_document_id {
        q = q.filter(audit_logs::vendor_document_id.eq(document_id));
    }

    let logs: Vec<AuditLog> = q.order(audit_logs::created_at.desc()).load(&mut conn)?;
    Ok(Json(logs))
}

pub fn configure_audit_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/audit-logs", get(list_audit_logs))
}
