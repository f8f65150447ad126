//! Vendor document lifecycle: upload, review, expiry windows.
//!
//! Review transitions are strict: only a stored `pending` document can be
//! approved or rejected, enforced with a conditional UPDATE keyed on
//! `(id, status = 'pending')` so two concurrent reviewers cannot both
//! succeed. Expiry never touches the stored status; readers derive it.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{self, AuditEntry};
use crate::billing;
use crate::compliance;
use crate::directory::AuthenticatedUser;
use crate::document_types::load_document_type;
use crate::error::ApiError;
use crate::shared::models::{ActionType, DocumentStatus, DocumentType, Vendor, VendorDocument};
use crate::shared::schema::vendor_documents;
use crate::shared::state::AppState;
use crate::vendors::load_vendor;

pub const DEFAULT_EXPIRING_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Deserialize)]
pub struct UploadDocumentRequest {
    pub vendor_id: Uuid,
    pub document_type_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: Option<i32>,
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Upload payload once the vendor is already resolved; shared with the
/// portal, which forces the vendor from the token instead of the body.
pub struct NewUpload {
    pub document_type_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: Option<i32>,
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveDocumentRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectDocumentRequest {
    pub rejection_reason: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = vendor_documents)]
struct ApproveChangeset {
    status: String,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub vendor_id: Option<Uuid>,
    pub status: Option<String>,
    pub document_type_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

/// A stored document row plus its status as observed now.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: VendorDocument,
    pub effective_status: DocumentStatus,
}

impl DocumentResponse {
    pub fn at(document: VendorDocument, now: DateTime<Utc>) -> Self {
        let effective_status = compliance::effective_status(&document, now);
        Self {
            document,
            effective_status,
        }
    }
}

pub(crate) fn type_applies(doc_type: &DocumentType, category: &str) -> bool {
    doc_type.applicable_categories.iter().any(|c| c == category)
}

/// Expiry for a new upload: an explicit date always wins; otherwise, for
/// types that expire, derive it from the issue date and the type's default
/// validity window when both are known.
pub(crate) fn derive_expiry(
    explicit: Option<DateTime<Utc>>,
    issue_date: Option<DateTime<Utc>>,
    doc_type: &DocumentType,
) -> Option<DateTime<Utc>> {
    if explicit.is_some() {
        return explicit;
    }
    if !doc_type.expiry_required {
        return None;
    }
    match (issue_date, doc_type.default_validity_days) {
        (Some(issued), Some(days)) => Some(issued + Duration::days(days as i64)),
        _ => None,
    }
}

fn load_document(conn: &mut PgConnection, id: Uuid) -> Result<VendorDocument, ApiError> {
    vendor_documents::table
        .filter(vendor_documents::id.eq(id))
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("Document"))
}

/// Validates and inserts a pending document for an already-resolved
/// vendor, then emits the upload audit entry.
pub(crate) fn insert_upload(
    conn: &mut PgConnection,
    vendor: &Vendor,
    upload: NewUpload,
    uploaded_by: Option<Uuid>,
    actor_type: &'static str,
) -> Result<VendorDocument, ApiError> {
    if upload.file_name.trim().is_empty() {
        return Err(ApiError::validation_field("file_name", "File name is required"));
    }

    let doc_type = load_document_type(conn, upload.document_type_id)?;
    if !type_applies(&doc_type, &vendor.category) {
        return Err(ApiError::validation_field(
            "document_type_id",
            format!(
                "Document type {} does not apply to category {}",
                doc_type.name, vendor.category
            ),
        ));
    }

    let org = billing::default_org(conn)?;
    billing::can_add_document(conn, &org)?;

    let now = Utc::now();
    let expiry_date = derive_expiry(upload.expiry_date, upload.issue_date, &doc_type);
    let document = VendorDocument {
        id: Uuid::new_v4(),
        vendor_id: vendor.id,
        document_type_id: doc_type.id,
        status: DocumentStatus::Pending.to_string(),
        file_name: Some(upload.file_name.clone()),
        file_path: Some(upload.file_path),
        file_size: upload.file_size,
        issue_date: upload.issue_date,
        expiry_date,
        uploaded_by,
        uploaded_at: Some(now),
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
        notes: upload.notes,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(vendor_documents::table)
        .values(&document)
        .execute(conn)?;

    audit::record(
        conn,
        AuditEntry {
            vendor_id: Some(vendor.id),
            vendor_document_id: Some(document.id),
            action_type: ActionType::Uploaded,
            actor_id: uploaded_by,
            actor_type,
            description: format!("Document uploaded: {}", upload.file_name),
        },
    );

    Ok(document)
}

pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Json(req): Json<UploadDocumentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let mut conn = state.conn.get()?;
    let vendor = load_vendor(&mut conn, req.vendor_id)?;

    let document = insert_upload(
        &mut conn,
        &vendor,
        NewUpload {
            document_type_id: req.document_type_id,
            file_name: req.file_name,
            file_path: req.file_path,
            file_size: req.file_size,
            issue_date: req.issue_date,
            expiry_date: req.expiry_date,
            notes: req.notes,
        },
        Some(auth.user_id),
        audit::ACTOR_USER,
    )?;

    Ok(Json(DocumentResponse::at(document, Utc::now())))
}

/// Only a stored `pending` document is eligible for review.
fn invalid_review(action: &str, status: &str) -> ApiError {
    ApiError::InvalidState(format!(
        "Cannot {} a document in status {}; only pending documents can be reviewed",
        action, status
    ))
}

/// Zero rows from a review CAS means the document was either absent or no
/// longer pending; tell those apart for the caller.
fn review_conflict(conn: &mut PgConnection, id: Uuid, action: &str) -> ApiError {
    match load_document(conn, id) {
        Ok(doc) => invalid_review(action, &doc.status),
        Err(e) => e,
    }
}

pub async fn approve_document(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ApproveDocumentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let mut conn = state.conn.get()?;
    let now = Utc::now();

    let updated = diesel::update(
        vendor_documents::table
            .filter(vendor_documents::id.eq(id))
            .filter(vendor_documents::status.eq(DocumentStatus::Pending.to_string())),
    )
    .set(&ApproveChangeset {
        status: DocumentStatus::Approved.to_string(),
        approved_by: Some(auth.user_id),
        approved_at: Some(now),
        notes: req.notes,
        updated_at: now,
    })
    .execute(&mut conn)?;

    if updated == 0 {
        return Err(review_conflict(&mut conn, id, "approve"));
    }

    let document = load_document(&mut conn, id)?;

    audit::record(
        &mut conn,
        AuditEntry {
            vendor_id: Some(document.vendor_id),
            vendor_document_id: Some(document.id),
            action_type: ActionType::Approved,
            actor_id: Some(auth.user_id),
            actor_type: audit::ACTOR_USER,
            description: "Document approved".to_string(),
        },
    );

    Ok(Json(DocumentResponse::at(document, now)))
}

pub async fn reject_document(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectDocumentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let reason = req
        .rejection_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            ApiError::validation_field("rejection_reason", "Rejection reason is required")
        })?
        .to_string();

    let mut conn = state.conn.get()?;
    let now = Utc::now();

    let updated = diesel::update(
        vendor_documents::table
            .filter(vendor_documents::id.eq(id))
            .filter(vendor_documents::status.eq(DocumentStatus::Pending.to_string())),
    )
    .set((
        vendor_documents::status.eq(DocumentStatus::Rejected.to_string()),
        vendor_documents::rejection_reason.eq(Some(reason.clone())),
        vendor_documents::updated_at.eq(now),
    ))
    .execute(&mut conn)?;

    if updated == 0 {
        return Err(review_conflict(&mut conn, id, "reject"));
    }

    let document = load_document(&mut conn, id)?;

    audit::record(
        &mut conn,
        AuditEntry {
            vendor_id: Some(document.vendor_id),
            vendor_document_id: Some(document.id),
            action_type: ActionType::Rejected,
            actor_id: Some(auth.user_id),
            actor_type: audit::ACTOR_USER,
            description: format!("Document rejected: {}", reason),
        },
    );

    Ok(Json(DocumentResponse::at(document, now)))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let mut conn = state.conn.get()?;
    let now = Utc::now();

    let mut q = vendor_documents::table.into_boxed();
    if let Some(vendor_id) = query.vendor_id {
        q = q.filter(vendor_documents::vendor_id.eq(vendor_id));
    }
    if let Some(type_id) = query.document_type_id {
        q = q.filter(vendor_documents::document_type_id.eq(type_id));
    }
    if let Some(status) = query.status {
        let status = status
            .parse::<DocumentStatus>()
            .map_err(|e| ApiError::validation_field("status", e))?;
        match status {
            // Missing is derived from the absence of a row.
            DocumentStatus::Missing => return Ok(Json(Vec::new())),
            // Expired and approved are effective-status filters computed
            // over (status, expiry_date); nothing is stored as expired.
            DocumentStatus::Expired => {
                q = q
                    .filter(vendor_documents::status.eq(DocumentStatus::Approved.to_string()))
                    .filter(vendor_documents::expiry_date.lt(now));
            }
            DocumentStatus::Approved => {
                q = q
                    .filter(vendor_documents::status.eq(DocumentStatus::Approved.to_string()))
                    .filter(
                        vendor_documents::expiry_date
                            .is_null()
                            .or(vendor_documents::expiry_date.ge(now)),
                    );
            }
            other => {
                q = q.filter(vendor_documents::status.eq(other.to_string()));
            }
        }
    }

    let rows: Vec<VendorDocument> = q
        .order(vendor_documents::updated_at.desc())
        .load(&mut conn)?;
    Ok(Json(
        rows.into_iter()
            .map(|d| DocumentResponse::at(d, now))
            .collect(),
    ))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let mut conn = state.conn.get()?;
    let document = load_document(&mut conn, id)?;
    Ok(Json(DocumentResponse::at(document, Utc::now())))
}

/// Approved documents whose expiry falls inside the coming window,
/// soonest first.
pub async fn list_expiring_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_EXPIRING_WINDOW_DAYS);
    if days <= 0 {
        return Err(ApiError::validation_field(
            "days",
            "Window must be at least one day",
        ));
    }

    let mut conn = state.conn.get()?;
    let now = Utc::now();
    let until = now + Duration::days(days);

    let rows: Vec<VendorDocument> = vendor_documents::table
        .filter(vendor_documents::status.eq(DocumentStatus::Approved.to_string()))
        .filter(vendor_documents::expiry_date.ge(now))
        .filter(vendor_documents::expiry_date.le(until))
        .order(vendor_documents::expiry_date.asc())
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|d| DocumentResponse::at(d, now))
            .collect(),
    ))
}

pub fn configure_documents_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vendor-documents", get(list_documents))
        .route("/api/vendor-documents/upload", post(upload_document))
        .route(
            "/api/vendor-documents/expiring",
            get(list_expiring_documents),
        )
        .route("/api/vendor-documents/:id", get(get_document))
        .route("/api/vendor-documents/:id/approve", post(approve_document))
        .route("/api/vendor-documents/:id/reject", post(reject_document))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_type(expiry_required: bool, default_validity_days: Option<i32>) -> DocumentType {
        DocumentType {
            id: Uuid::new_v4(),
            name: "Insurance Certificate".to_string(),
            description: None,
            applicable_categories: vec!["Logistics".to_string(), "Services".to_string()],
            is_required: true,
            expiry_required,
            default_validity_days,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_type_applies() {
        let t = doc_type(true, None);
        assert!(type_applies(&t, "Logistics"));
        assert!(!type_applies(&t, "Packaging"));
    }

    #[test]
    fn test_derive_expiry_prefers_explicit_date() {
        let t = doc_type(true, Some(365));
        let issued = Utc::now();
        let explicit = issued + Duration::days(90);

        assert_eq!(
            derive_expiry(Some(explicit), Some(issued), &t),
            Some(explicit)
        );
    }

    #[test]
    fn test_derive_expiry_from_validity_window() {
        let t = doc_type(true, Some(365));
        let issued = Utc::now();

        assert_eq!(
            derive_expiry(None, Some(issued), &t),
            Some(issued + Duration::days(365))
        );
    }

    #[test]
    fn test_derive_expiry_absent_without_inputs() {
        let t = doc_type(true, None);
        assert_eq!(derive_expiry(None, Some(Utc::now()), &t), None);

        let t = doc_type(true, Some(365));
        assert_eq!(derive_expiry(None, None, &t), None);
    }

    #[test]
    fn test_derive_expiry_skipped_for_non_expiring_types() {
        let t = doc_type(false, Some(365));
        assert_eq!(derive_expiry(None, Some(Utc::now()), &t), None);
    }

    #[test]
    fn test_invalid_review_is_a_conflict() {
        let err = invalid_review("approve", "approved");
        assert!(matches!(err, ApiError::InvalidState(_)));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_review_names_the_blocking_status() {
        let err = invalid_review("reject", "rejected");
        assert!(err.to_string().contains("rejected"));
        assert!(err.to_string().contains("only pending"));
    }
}
