//! Combines every module router into the unified API surface.
//!
//! Portal routes are public by construction (the token is the
//! credential); everything else sits behind the principal middleware.

use axum::extract::State;
use axum::routing::get;
use axum::{middleware, Json, Router};
use std::sync::Arc;

use crate::shared::state::AppState;
use crate::{
    audit, billing, dashboards, directory, document_types, documents, notifications, portal,
    vendors,
};

pub fn configure_api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .merge(directory::configure_directory_routes())
        .merge(vendors::configure_vendors_routes())
        .merge(document_types::configure_document_types_routes())
        .merge(documents::configure_documents_routes())
        .merge(dashboards::configure_dashboards_routes())
        .merge(billing::configure_billing_routes())
        .merge(notifications::configure_notifications_routes())
        .merge(audit::configure_audit_routes())
        .route_layer(middleware::from_fn_with_state(
            state,
            directory::auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .merge(portal::configure_portal_routes())
        .route("/health", get(handle_health))
}

async fn handle_health(State(_state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
