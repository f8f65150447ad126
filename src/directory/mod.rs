//! Users and the authenticated principal.
//!
//! Session handling lives with the external identity provider; the proxy
//! in front of this service validates the session and forwards the
//! principal id in the `x-user-id` header. The middleware here resolves
//! that header to a user row (creating one on first sight, read-only) and
//! parks an [`AuthenticatedUser`] in request extensions for handlers.

use axum::body::Body;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::billing;
use crate::error::ApiError;
use crate::shared::models::{User, UserRole};
use crate::shared::schema::users;
use crate::shared::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == UserRole::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

fn resolve_principal(state: &AppState, principal_id: Uuid) -> Result<AuthenticatedUser, ApiError> {
    let mut conn = state.conn.get()?;

    let existing: Option<User> = users::table
        .filter(users::id.eq(principal_id))
        .first(&mut conn)
        .optional()?;

    let user = match existing {
        Some(user) => user,
        None => {
            // First sight of a provider-validated principal: create the
            // row with the least privileged role.
            let org = billing::default_org(&mut conn)?;
            let now = Utc::now();
            let user = User {
                id: principal_id,
                org_id: org.id,
                email: None,
                first_name: None,
                last_name: None,
                profile_image_url: None,
                role: UserRole::ReadOnly.to_string(),
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(users::table)
                .values(&user)
                .execute(&mut conn)?;
            user
        }
    };

    Ok(AuthenticatedUser {
        user_id: user.id,
        email: user.email,
        role: user.role.parse().unwrap_or(UserRole::ReadOnly),
    })
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let principal_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok());

    let principal_id = match principal_id {
        Some(id) => id,
        None => return ApiError::Unauthorized.into_response(),
    };

    match resolve_principal(&state, principal_id) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<Json<User>, ApiError> {
    let mut conn = state.conn.get()?;
    let user: User = users::table
        .filter(users::id.eq(auth.user_id))
        .first(&mut conn)
        .optional()?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _auth: AuthenticatedUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let mut conn = state.conn.get()?;
    let all: Vec<User> = users::table
        .order(users::created_at.desc())
        .load(&mut conn)?;
    Ok(Json(all))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    auth.require_admin()?;

    if req.email.trim().is_empty() {
        return Err(ApiError::validation_field("email", "Email is required"));
    }
    let role = match req.role.as_deref() {
        Some(value) => value
            .parse::<UserRole>()
            .map_err(|e| ApiError::validation_field("role", e))?,
        None => UserRole::ReadOnly,
    };

    let mut conn = state.conn.get()?;
    let org = billing::default_org(&mut conn)?;
    billing::can_add_user(&mut conn, &org)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        org_id: org.id,
        email: Some(req.email),
        first_name: req.first_name,
        last_name: req.last_name,
        profile_image_url: None,
        role: role.to_string(),
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(users::table)
        .values(&user)
        .execute(&mut conn)?;

    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<User>, ApiError> {
    auth.require_admin()?;

    let role = req
        .role
        .parse::<UserRole>()
        .map_err(|e| ApiError::validation_field("role", e))?;

    let mut conn = state.conn.get()?;
    let updated = diesel::update(users::table.filter(users::id.eq(id)))
        .set((
            users::role.eq(role.to_string()),
            users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(ApiError::NotFound("User"));
    }

    let user: User = users::table.filter(users::id.eq(id)).first(&mut conn)?;
    Ok(Json(user))
}

pub fn configure_directory_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/user", get(get_current_user))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id/role", put(update_user_role))
}
