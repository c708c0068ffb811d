//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps calculator, validation, and mileage-resolution failures to HTTP
//! status codes with a JSON body of `{ error: { code, message, details } }`.
//! Internal error details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use haulrate_providers::ResolutionFailure;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context, present only for client errors that carry it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request failed business validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid identity (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is outside the target load's broker scope (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Routed mileage could not be resolved (422). Details carry the
    /// failure code, message, and per-provider attempts.
    #[error("{}", .0.message)]
    MileageUnresolved(ResolutionFailure),

    /// Internal server error (500). Logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::MileageUnresolved(_) => (StatusCode::UNPROCESSABLE_ENTITY, "MILEAGE_UNRESOLVED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match &self {
            Self::MileageUnresolved(failure) => serde_json::to_value(failure).ok(),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<haulrate_core::NegotiationError> for AppError {
    fn from(err: haulrate_core::NegotiationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<haulrate_core::ValidationError> for AppError {
    fn from(err: haulrate_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
