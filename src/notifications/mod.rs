use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::shared::models::NotificationRule;
use crate::shared::schema::notification_rules;
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRuleRequest {
    pub name: String,
    pub days_before: i32,
    pub is_active: Option<bool>,
    pub notify_vendor: Option<bool>,
    pub notify_internal: Option<bool>,
    pub internal_recipients: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotificationRuleRequest {
    pub name: Option<String>,
    pub days_before: Option<i32>,
    pub is_active: Option<bool>,
    pub notify_vendor: Option<bool>,
    pub notify_internal: Option<bool>,
    pub internal_recipients: Option<Vec<String>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = notification_rules)]
struct NotificationRuleChangeset {
    name: Option<String>,
    days_before: Option<i32>,
    is_active: Option<bool>,
    notify_vendor: Option<bool>,
    notify_internal: Option<bool>,
    internal_recipients: Option<Vec<String>>,
}

pub async fn list_notification_rules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NotificationRule>>, ApiError> {
    let mut conn = state.conn.get()?;
    let rules: Vec<NotificationRule> = notification_rules::table
        .order(notification_rules::days_before.asc())
        .load(&mut conn)?;
    Ok(Json(rules))
}

pub async fn create_notification_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNotificationRuleRequest>,
) -> Result<Json<NotificationRule>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation_field("name", "Name is required"));
    }
    if req.days_before < 0 {
        return Err(ApiError::validation_field(
            "days_before",
            "Days before expiry cannot be negative",
        ));
    }

    let mut conn = state.conn.get()?;
    let rule = NotificationRule {
        id: Uuid::new_v4(),
        name: req.name,
        is_active: req.is_active.unwrap_or(true),
        days_before: req.days_before,
        notify_vendor: req.notify_vendor.unwrap_or(true),
        notify_internal: req.notify_internal.unwrap_or(true),
        internal_recipients: req.internal_recipients,
        created_at: Utc::now(),
    };

    diesel::insert_into(notification_rules::table)
        .values(&rule)
        .execute(&mut conn)?;

    Ok(Json(rule))
}

pub async fn update_notification_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNotificationRuleRequest>,
) -> Result<Json<NotificationRule>, ApiError> {
    if let Some(days) = req.days_before {
        if days < 0 {
            return Err(ApiError::validation_field(
                "days_before",
                "Days before expiry cannot be negative",
            ));
        }
    }
    if req.name.is_none()
        && req.days_before.is_none()
        && req.is_active.is_none()
        && req.notify_vendor.is_none()
        && req.notify_internal.is_none()
        && req.internal_recipients.is_none()
    {
        return Err(ApiError::validation("No fields to update"));
    }

    let mut conn = state.conn.get()?;
    let changeset = NotificationRuleChangeset {
        name: req.name,
        days_before: req.days_before,
        is_active: req.is_active,
        notify_vendor: req.notify_vendor,
        notify_internal: req.notify_internal,
        internal_recipients: req.internal_recipients,
    };

    let updated =
        diesel::update(notification_rules::table.filter(notification_rules::id.eq(id)))
            .set(&changeset)
            .execute(&mut conn)?;
    if updated == 0 {
        return Err(ApiError::NotFound("Notification rule"));
    }

    let rule: NotificationRule = notification_rules::table
        .filter(notification_rules::id.eq(id))
        .first(&mut conn)?;
    Ok(Json(rule))
}

pub async fn delete_notification_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get()?;
    let deleted = diesel::delete(notification_rules::table.filter(notification_rules::id.eq(id)))
        .execute(&mut conn)?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Notification rule"));
    }
    Ok(Json(serde_json::json!({
        "message": "Notification rule deleted"
    })))
}

pub fn configure_notifications_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/notification-rules",
            get(list_notification_rules).post(create_notification_rule),
        )
        .route(
            "/api/notification-rules/:id",
            put(update_notification_rule).delete(delete_notification_rule),
        )
}
