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
use crate::compliance::{self, VendorCompliance};
use crate::directory::AuthenticatedUser;
use crate::error::ApiError;
use crate::shared::models::{
    ActionType, DocumentType, RiskLevel, Vendor, VendorDocument, VendorStatus,
};
use crate::shared::schema::{document_types, vendor_documents, vendors};
use crate::shared::state::AppState;

pub const PORTAL_TOKEN_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
    pub legal_entity_name: Option<String>,
    pub category: String,
    pub risk_level: Option<String>,
    pub status: Option<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub primary_contact_phone: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVendorRequest {
    pub name: Option<String>,
    pub legal_entity_name: Option<String>,
    pub category: Option<String>,
    pub risk_level: Option<String>,
    pub status: Option<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub primary_contact_phone: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = vendors)]
struct VendorChangeset {
    name: Option<String>,
    legal_entity_name: Option<String>,
    category: Option<String>,
    risk_level: Option<String>,
    status: Option<String>,
    primary_contact_name: Option<String>,
    primary_contact_email: Option<String>,
    primary_contact_phone: Option<String>,
    tags: Option<Vec<String>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct VendorQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub risk_level: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssuePortalTokenRequest {
    pub validity_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PortalTokenResponse {
    pub token: String,
    pub expiry: DateTime<Utc>,
    pub portal_url: String,
}

/// A fresh opaque portal credential and its expiry instant. The two are
/// always written to the vendor row together.
pub fn new_portal_token(now: DateTime<Utc>, validity_days: i64) -> (String, DateTime<Utc>) {
    (
        Uuid::new_v4().to_string(),
        now + Duration::days(validity_days),
    )
}

pub(crate) fn load_vendor(conn: &mut PgConnection, id: Uuid) -> Result<Vendor, ApiError> {
    vendors::table
        .filter(vendors::id.eq(id))
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("Vendor"))
}

pub async fn list_vendors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VendorQuery>,
) -> Result<Json<Vec<Vendor>>, ApiError> {
    let mut conn = state.conn.get()?;

    let mut q = vendors::table.into_boxed();

    if let Some(category) = query.category {
        q = q.filter(vendors::category.eq(category));
    }
    if let Some(status) = query.status {
        let status = status
            .parse::<VendorStatus>()
            .map_err(|e| ApiError::validation_field("status", e))?;
        q = q.filter(vendors::status.eq(status.to_string()));
    }
    if let Some(risk) = query.risk_level {
        let risk = risk
            .parse::<RiskLevel>()
            .map_err(|e| ApiError::validation_field("risk_level", e))?;
        q = q.filter(vendors::risk_level.eq(risk.to_string()));
    }
    if let Some(search) = query.search {
        let pattern = format!("%{}%", search);
        q = q.filter(
            vendors::name
                .nullable()
                .ilike(pattern.clone())
                .or(vendors::primary_contact_email.ilike(pattern)),
        );
    }

    let result: Vec<Vendor> = q.order(vendors::created_at.desc()).load(&mut conn)?;
    Ok(Json(result))
}

pub async fn get_vendor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vendor>, ApiError> {
    let mut conn = state.conn.get()?;
    Ok(Json(load_vendor(&mut conn, id)?))
}

pub async fn create_vendor(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Json(req): Json<CreateVendorRequest>,
) -> Result<Json<Vendor>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation_field("name", "Vendor name is required"));
    }
    if req.category.trim().is_empty() {
        return Err(ApiError::validation_field("category", "Category is required"));
    }
    let risk_level = match req.risk_level.as_deref() {
        Some(value) => value
            .parse::<RiskLevel>()
            .map_err(|e| ApiError::validation_field("risk_level", e))?,
        None => RiskLevel::Low,
    };
    let status = match req.status.as_deref() {
        Some(value) => value
            .parse::<VendorStatus>()
            .map_err(|e| ApiError::validation_field("status", e))?,
        None => VendorStatus::Active,
    };

    let mut conn = state.conn.get()?;
    let org = billing::default_org(&mut conn)?;
    billing::can_add_vendor(&mut conn, &org)?;

    let now = Utc::now();
    let vendor = Vendor {
        id: Uuid::new_v4(),
        org_id: org.id,
        name: req.name,
        legal_entity_name: req.legal_entity_name,
        category: req.category,
        risk_level: risk_level.to_string(),
        status: status.to_string(),
        primary_contact_name: req.primary_contact_name,
        primary_contact_email: req.primary_contact_email,
        primary_contact_phone: req.primary_contact_phone,
        tags: req.tags,
        portal_token: None,
        portal_token_expiry: None,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(vendors::table)
        .values(&vendor)
        .execute(&mut conn)?;

    audit::record(
        &mut conn,
        AuditEntry {
            vendor_id: Some(vendor.id),
            vendor_document_id: None,
            action_type: ActionType::Created,
            actor_id: Some(auth.user_id),
            actor_type: audit::ACTOR_USER,
            description: format!("Vendor {} created", vendor.name),
        },
    );

    Ok(Json(vendor))
}

pub async fn update_vendor(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVendorRequest>,
) -> Result<Json<Vendor>, ApiError> {
    if let Some(risk) = req.risk_level.as_deref() {
        risk.parse::<RiskLevel>()
            .map_err(|e| ApiError::validation_field("risk_level", e))?;
    }
    if let Some(status) = req.status.as_deref() {
        status
            .parse::<VendorStatus>()
            .map_err(|e| ApiError::validation_field("status", e))?;
    }

    let mut conn = state.conn.get()?;

    let changeset = VendorChangeset {
        name: req.name,
        legal_entity_name: req.legal_entity_name,
        category: req.category,
        risk_level: req.risk_level,
        status: req.status,
        primary_contact_name: req.primary_contact_name,
        primary_contact_email: req.primary_contact_email,
        primary_contact_phone: req.primary_contact_phone,
        tags: req.tags,
        updated_at: Utc::now(),
    };

    let updated = diesel::update(vendors::table.filter(vendors::id.eq(id)))
        .set(&changeset)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(ApiError::NotFound("Vendor"));
    }

    let vendor = load_vendor(&mut conn, id)?;

    audit::record(
        &mut conn,
        AuditEntry {
            vendor_id: Some(vendor.id),
            vendor_document_id: None,
            action_type: ActionType::Updated,
            actor_id: Some(auth.user_id),
            actor_type: audit::ACTOR_USER,
            description: format!("Vendor {} updated", vendor.name),
        },
    );

    Ok(Json(vendor))
}

/// Archival is a soft status flip; vendor rows are never hard-deleted in
/// the normal flow.
pub async fn archive_vendor(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get()?;
    let vendor = load_vendor(&mut conn, id)?;

    diesel::update(vendors::table.filter(vendors::id.eq(id)))
        .set((
            vendors::status.eq(VendorStatus::Inactive.to_string()),
            vendors::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    audit::record(
        &mut conn,
        AuditEntry {
            vendor_id: Some(id),
            vendor_document_id: None,
            action_type: ActionType::StatusChange,
            actor_id: Some(auth.user_id),
            actor_type: audit::ACTOR_USER,
            description: format!("Vendor {} archived", vendor.name),
        },
    );

    Ok(Json(serde_json::json!({
        "message": "Vendor archived successfully"
    })))
}

/// Issues a fresh portal token, replacing whatever token the vendor had.
/// Token and expiry land in one UPDATE so the pair is never torn, and the
/// previous link dies the moment this commits.
pub async fn issue_portal_token(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<IssuePortalTokenRequest>,
) -> Result<Json<PortalTokenResponse>, ApiError> {
    let validity_days = req.validity_days.unwrap_or(PORTAL_TOKEN_VALIDITY_DAYS);
    if validity_days <= 0 {
        return Err(ApiError::validation_field(
            "validity_days",
            "Validity must be at least one day",
        ));
    }

    let mut conn = state.conn.get()?;
    let vendor = load_vendor(&mut conn, id)?;

    let (token, expiry) = new_portal_token(Utc::now(), validity_days);

    diesel::update(vendors::table.filter(vendors::id.eq(id)))
        .set((
            vendors::portal_token.eq(Some(token.clone())),
            vendors::portal_token_expiry.eq(Some(expiry)),
            vendors::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    audit::record(
        &mut conn,
        AuditEntry {
            vendor_id: Some(id),
            vendor_document_id: None,
            action_type: ActionType::Updated,
            actor_id: Some(auth.user_id),
            actor_type: audit::ACTOR_USER,
            description: format!("Portal link issued for vendor {}", vendor.name),
        },
    );

    let portal_url = format!("{}/portal/{}", state.config.server.base_url, token);
    Ok(Json(PortalTokenResponse {
        token,
        expiry,
        portal_url,
    }))
}

pub async fn get_vendor_compliance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<VendorCompliance>, ApiError> {
    let mut conn = state.conn.get()?;
    let vendor = load_vendor(&mut conn, id)?;

    let types: Vec<DocumentType> = document_types::table.load(&mut conn)?;
    let docs: Vec<VendorDocument> = vendor_documents::table
        .filter(vendor_documents::vendor_id.eq(id))
        .load(&mut conn)?;

    let required = compliance::required_document_types(&vendor.category, &types);
    Ok(Json(compliance::vendor_compliance(
        &required,
        &docs,
        Utc::now(),
    )))
}

pub fn configure_vendors_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vendors", get(list_vendors).post(create_vendor))
        .route(
            "/api/vendors/:id",
            get(get_vendor).patch(update_vendor).delete(archive_vendor),
        )
        .route("/api/vendors/:id/portal-token", post(issue_portal_token))
        .route("/api/vendors/:id/compliance", get(get_vendor_compliance))
}
