use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::compliance;
use crate::error::ApiError;
use crate::shared::models::DocumentType;
use crate::shared::schema::{document_types, vendor_documents};
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDocumentTypeRequest {
    pub name: String,
    pub description: Option<String>,
    pub applicable_categories: Vec<String>,
    pub is_required: Option<bool>,
    pub expiry_required: Option<bool>,
    pub default_validity_days: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentTypeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub applicable_categories: Option<Vec<String>>,
    pub is_required: Option<bool>,
    pub expiry_required: Option<bool>,
    pub default_validity_days: Option<i32>,
}

#[derive(AsChangeset)]
#[diesel(table_name = document_types)]
struct DocumentTypeChangeset {
    name: Option<String>,
    description: Option<String>,
    applicable_categories: Option<Vec<String>>,
    is_required: Option<bool>,
    expiry_required: Option<bool>,
    default_validity_days: Option<i32>,
}

fn validate_categories(categories: &[String]) -> Result<(), ApiError> {
    if categories.is_empty() || categories.iter().all(|c| c.trim().is_empty()) {
        return Err(ApiError::validation_field(
            "applicable_categories",
            "At least one applicable category is required",
        ));
    }
    Ok(())
}

pub(crate) fn load_document_type(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<DocumentType, ApiError> {
    document_types::table
        .filter(document_types::id.eq(id))
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("Document type"))
}

pub async fn list_document_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DocumentType>>, ApiError> {
    let mut conn = state.conn.get()?;
    let types: Vec<DocumentType> = document_types::table
        .order(document_types::name.asc())
        .load(&mut conn)?;
    Ok(Json(types))
}

#[derive(Debug, Deserialize)]
pub struct RequiredTypesQuery {
    pub category: String,
}

/// The document types a vendor of the given category must satisfy.
pub async fn list_required_document_types(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RequiredTypesQuery>,
) -> Result<Json<Vec<DocumentType>>, ApiError> {
    if query.category.trim().is_empty() {
        return Err(ApiError::validation_field("category", "Category is required"));
    }

    let mut conn = state.conn.get()?;
    let types: Vec<DocumentType> = document_types::table
        .order(document_types::name.asc())
        .load(&mut conn)?;

    let required = compliance::required_document_types(&query.category, &types)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(required))
}

pub async fn create_document_type(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDocumentTypeRequest>,
) -> Result<Json<DocumentType>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation_field("name", "Name is required"));
    }
    validate_categories(&req.applicable_categories)?;

    let mut conn = state.conn.get()?;
    let doc_type = DocumentType {
        id: Uuid::new_v4(),
        name: req.name,
        description: req.description,
        applicable_categories: req.applicable_categories,
        is_required: req.is_required.unwrap_or(true),
        expiry_required: req.expiry_required.unwrap_or(true),
        default_validity_days: req.default_validity_days,
        created_at: Utc::now(),
    };

    diesel::insert_into(document_types::table)
        .values(&doc_type)
        .execute(&mut conn)?;

    Ok(Json(doc_type))
}

pub async fn update_document_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDocumentTypeRequest>,
) -> Result<Json<DocumentType>, ApiError> {
    if let Some(categories) = &req.applicable_categories {
        validate_categories(categories)?;
    }
    if req.name.is_none()
        && req.description.is_none()
        && req.applicable_categories.is_none()
        && req.is_required.is_none()
        && req.expiry_required.is_none()
        && req.default_validity_days.is_none()
    {
        return Err(ApiError::validation("No fields to update"));
    }

    let mut conn = state.conn.get()?;
    let changeset = DocumentTypeChangeset {
        name: req.name,
        description: req.description,
        applicable_categories: req.applicable_categories,
        is_required: req.is_required,
        expiry_required: req.expiry_required,
        default_validity_days: req.default_validity_days,
    };

    let updated = diesel::update(document_types::table.filter(document_types::id.eq(id)))
        .set(&changeset)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(ApiError::NotFound("Document type"));
    }

    Ok(Json(load_document_type(&mut conn, id)?))
}

pub async fn delete_document_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get()?;
    load_document_type(&mut conn, id)?;

    let in_use: i64 = vendor_documents::table
        .filter(vendor_documents::document_type_id.eq(id))
        .count()
        .get_result(&mut conn)?;
    if in_use > 0 {
        return Err(ApiError::InvalidState(
            "Document type has uploaded documents and cannot be deleted".to_string(),
        ));
    }

    diesel::delete(document_types::table.filter(document_types::id.eq(id)))
        .execute(&mut conn)?;

    Ok(Json(serde_json::json!({
        "message": "Document type deleted"
    })))
}

pub fn configure_document_types_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/document-types",
            get(list_document_types).post(create_document_type),
        )
        .route(
            "/api/document-types/required",
            get(list_required_document_types),
        )
        .route(
            "/api/document-types/:id",
            put(update_document_type).delete(delete_document_type),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_categories_rejects_empty() {
        assert!(validate_categories(&[]).is_err());
        assert!(validate_categories(&["".to_string(), "  ".to_string()]).is_err());
        assert!(validate_categories(&["Packaging".to_string()]).is_ok());
    }
}
