//! Error taxonomy for the service.
//!
//! External-source failures, validation failures, not-found and internal
//! faults each map to a distinct HTTP status; internal detail is logged
//! server-side and never leaks past a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Storage-layer error. Kept separate so store trait implementations and
/// test doubles share one error surface.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Refresh-pipeline error. `SourceUnavailable` is distinguishable from
/// internal faults so the handler can answer 503 instead of 500.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("external source {endpoint} unavailable: {reason}")]
    SourceUnavailable { endpoint: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary-image rendering error. Never escalated past a warning by the
/// orchestrator; isolated here so that policy is testable.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("font data is invalid")]
    InvalidFont,

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-level error, mapped onto an HTTP response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("external data source unavailable")]
    SourceUnavailable { endpoint: String, reason: String },

    #[error("validation failed")]
    Validation { details: BTreeMap<String, String> },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn country_not_found() -> Self {
        Self::NotFound("Country not found".to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::SourceUnavailable { endpoint, reason } => {
                Self::SourceUnavailable { endpoint, reason }
            }
            RefreshError::Store(e) => Self::Internal(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::SourceUnavailable { endpoint, reason } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "External data source unavailable",
                    "details": format!("Could not fetch data from {endpoint}. Reason: {reason}"),
                }),
            ),
            Self::Validation { details } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "details": details }),
            ),
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_source_failure_maps_to_503() {
        let err: ApiError = RefreshError::SourceUnavailable {
            endpoint: "https://example.com/rates".to_string(),
            reason: "timeout".to_string(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn store_failure_maps_to_500() {
        let err: ApiError = StoreError::Database(sqlx::Error::PoolClosed).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
