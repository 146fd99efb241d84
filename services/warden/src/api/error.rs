//! HTTP error bodies for the v1 API.
//!
//! Handlers return [`ApiError`]; service errors convert into it with `?`.
//! The status always agrees with `body.code`:
//!
//! | `AuthzError`  | status | code                   |
//! |---------------|--------|------------------------|
//! | `Validation`  | 400    | `validation_error`     |
//! | `NotFound`    | 404    | `not_found`            |
//! | `Conflict`    | 409    | `conflict`             |
//! | `Upstream`    | 503    | `upstream_unavailable` |
//!
//! A missing internal API key is a 401 `unauthorized`. Upstream causes are
//! logged and never echoed to the caller.
use crate::api::types::ErrorResponse;
use crate::authz::AuthzError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
                request_id: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Validation(message) => api_validation_error(&message),
            AuthzError::NotFound(what) => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
            }
            AuthzError::Conflict(message) => {
                ApiError::new(StatusCode::CONFLICT, "conflict", message)
            }
            AuthzError::Upstream(err) => api_upstream_unavailable(&err),
        }
    }
}

pub fn api_validation_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// Grant store or principal directory unreachable. Callers must treat it as a denial.
pub fn api_upstream_unavailable(err: &anyhow::Error) -> ApiError {
    tracing::error!(error = ?err, "warden upstream unavailable");
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "upstream_unavailable",
        "upstream dependency unavailable",
    )
}
