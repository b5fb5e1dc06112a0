// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Which credit counter ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    Analysis,
    AdviceChat,
}

impl fmt::Display for CreditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreditKind::Analysis => f.write_str("analysis"),
            CreditKind::AdviceChat => f.write_str("advice chat"),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("You have no {0} credits remaining.")]
    NoCredits(CreditKind),

    #[error("Permission denied: {operation} on {path}")]
    PermissionDenied { path: String, operation: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("AI model error: {0}")]
    AiModel(String),

    #[error("Service temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build a permission error and report it on the permission side channel.
    ///
    /// Every denial is emitted as a structured event carrying the document
    /// path and the attempted operation, so denials can be audited apart from
    /// ordinary request failures.
    pub fn permission_denied(path: impl Into<String>, operation: impl Into<String>) -> Self {
        let path = path.into();
        let operation = operation.into();
        tracing::warn!(
            target: "permission_error",
            path = %path,
            operation = %operation,
            "Permission denied"
        );
        AppError::PermissionDenied { path, operation }
    }

    /// Map a store failure on `path` to an application error.
    ///
    /// Backend permission failures go through the permission side channel;
    /// everything else is a plain database error.
    pub fn from_store(path: &str, operation: &str, err: impl fmt::Display) -> Self {
        let msg = err.to_string();
        if msg.contains("PermissionDenied") || msg.contains("PERMISSION_DENIED") {
            return Self::permission_denied(path, operation);
        }
        AppError::Database(format!("{operation} {path}: {msg}"))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NoCredits(_) => (
                StatusCode::PAYMENT_REQUIRED,
                "no_credits",
                Some(self.to_string()),
            ),
            AppError::PermissionDenied { path, .. } => (
                StatusCode::FORBIDDEN,
                "permission_denied",
                Some(path.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::AiModel(msg) => {
                tracing::warn!(error = %msg, "AI model error");
                (StatusCode::BAD_GATEWAY, "model_error", None)
            }
            AppError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "Dependency unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_credits_maps_to_payment_required() {
        let response = AppError::NoCredits(CreditKind::Analysis).into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_no_credits_message() {
        assert_eq!(
            AppError::NoCredits(CreditKind::Analysis).to_string(),
            "You have no analysis credits remaining."
        );
        assert_eq!(
            AppError::NoCredits(CreditKind::AdviceChat).to_string(),
            "You have no advice chat credits remaining."
        );
    }

    #[test]
    fn test_from_store_detects_permission_failures() {
        let err = AppError::from_store("users/abc", "update", "status: PermissionDenied");
        assert!(matches!(
            err,
            AppError::PermissionDenied { ref path, ref operation }
                if path == "users/abc" && operation == "update"
        ));

        let err = AppError::from_store("users/abc", "get", "deadline exceeded");
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                AppError::permission_denied("users/x", "delete"),
                StatusCode::FORBIDDEN,
            ),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::AiModel("x".into()), StatusCode::BAD_GATEWAY),
            (
                AppError::Unavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Database("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
