//! Passwordless vendor portal.
//!
//! Every route here is keyed by an opaque portal token instead of a
//! session. A token that is unknown and a token that has expired produce
//! the same not-found outcome, so callers cannot probe which tokens ever
//! existed. A resolved token scopes the caller to exactly one vendor:
//! its record, its documents, its compliance summary, and uploads for it.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit;
use crate::compliance::{self, VendorCompliance};
use crate::documents::{self, DocumentResponse, NewUpload};
use crate::error::ApiError;
use crate::shared::models::{DocumentType, Vendor, VendorDocument};
use crate::shared::schema::{document_types, vendor_documents, vendors};
use crate::shared::state::AppState;

/// Vendor record as exposed through the portal. The portal credential
/// columns stay server-side.
#[derive(Debug, Serialize)]
pub struct PortalVendor {
    pub id: Uuid,
    pub name: String,
    pub legal_entity_name: Option<String>,
    pub category: String,
    pub risk_level: String,
    pub status: String,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub primary_contact_phone: Option<String>,
}

impl From<Vendor> for PortalVendor {
    fn from(v: Vendor) -> Self {
        Self {
            id: v.id,
            name: v.name,
            legal_entity_name: v.legal_entity_name,
            category: v.category,
            risk_level: v.risk_level,
            status: v.status,
            primary_contact_name: v.primary_contact_name,
            primary_contact_email: v.primary_contact_email,
            primary_contact_phone: v.primary_contact_phone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PortalUploadRequest {
    pub document_type_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: Option<i32>,
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Looks up the vendor holding this token, provided the token is still
/// inside its validity window. Unknown and expired tokens produce the
/// same miss.
pub(crate) fn resolve_token(
    conn: &mut PgConnection,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Vendor, ApiError> {
    vendors::table
        .filter(vendors::portal_token.eq(token))
        .filter(vendors::portal_token_expiry.ge(now))
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("Portal link"))
}

pub async fn get_portal_vendor(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<PortalVendor>, ApiError> {
    let mut conn = state.conn.get()?;
    let vendor = resolve_token(&mut conn, &token, Utc::now())?;
    Ok(Json(vendor.into()))
}

pub async fn list_portal_documents(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let mut conn = state.conn.get()?;
    let now = Utc::now();
    let vendor = resolve_token(&mut conn, &token, now)?;

    let rows: Vec<VendorDocument> = vendor_documents::table
        .filter(vendor_documents::vendor_id.eq(vendor.id))
        .order(vendor_documents::updated_at.desc())
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|d| DocumentResponse::at(d, now))
            .collect(),
    ))
}

pub async fn get_portal_compliance(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<VendorCompliance>, ApiError> {
    let mut conn = state.conn.get()?;
    let now = Utc::now();
    let vendor = resolve_token(&mut conn, &token, now)?;

    let types: Vec<DocumentType> = document_types::table.load(&mut conn)?;
    let docs: Vec<VendorDocument> = vendor_documents::table
        .filter(vendor_documents::vendor_id.eq(vendor.id))
        .load(&mut conn)?;

    let required = compliance::required_document_types(&vendor.category, &types);
    Ok(Json(compliance::vendor_compliance(&required, &docs, now)))
}

/// Self-service upload. The vendor comes from the token, never from the
/// body, so a portal caller cannot write into another vendor's document
/// set.
pub async fn portal_upload_document(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<PortalUploadRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let mut conn = state.conn.get()?;
    let now = Utc::now();
    let vendor = resolve_token(&mut conn, &token, now)?;

    let document = documents::insert_upload(
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
        None,
        audit::ACTOR_VENDOR,
    )?;

    Ok(Json(DocumentResponse::at(document, now)))
}

pub fn configure_portal_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/portal/:token", get(get_portal_vendor))
        .route(
            "/api/portal/:token/documents",
            get(list_portal_documents).post(portal_upload_document),
        )
        .route("/api/portal/:token/compliance", get(get_portal_compliance))
}
