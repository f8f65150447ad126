//! Error taxonomy shared by every API handler.
//!
//! Three failure classes carry meaning for callers: validation problems
//! (rejected input, never retried), missing entities, and transitions
//! attempted from a non-eligible state. Everything else is fatal to the
//! current operation and propagated uninterpreted.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Database(_) | Self::Pool(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }

        // Store failures are not described to callers beyond their class.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut body = serde_json::json!({
            "error": self.code(),
            "message": message,
        });
        if let Self::Validation {
            field: Some(field), ..
        } = &self
        {
            body["field"] = serde_json::json!(field);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("Vendor").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidState("already approved".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::QuotaExceeded("vendor limit".into()).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(ApiError::NotFound("Vendor").to_string(), "Vendor not found");
    }

    #[test]
    fn test_validation_field_detail() {
        let err = ApiError::validation_field("rejection_reason", "Rejection reason is required");
        assert_eq!(err.code(), "validation_error");
        match err {
            ApiError::Validation { field, .. } => assert_eq!(field, Some("rejection_reason")),
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn test_codes() {
        assert_eq!(ApiError::NotFound("Document").code(), "not_found");
        assert_eq!(
            ApiError::InvalidState("x".into()).code(),
            "invalid_state"
        );
    }
}
