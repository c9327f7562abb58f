// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("QR token signature mismatch")]
    InvalidSignature,

    #[error("QR token expired")]
    QrExpired,

    #[error("QR token timestamp is not a valid ISO-8601 datetime")]
    InvalidTimestamp,

    #[error("Server misconfigured: {0}")]
    Misconfigured(&'static str),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Machine-readable reason string returned in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingFields(_) => "missing_fields",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidSignature => "invalid_signature",
            AppError::QrExpired => "qr_expired",
            AppError::InvalidTimestamp => "invalid_timestamp",
            AppError::Misconfigured(_) => "server_misconfigured",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFields(_)
            | AppError::BadRequest(_)
            | AppError::QrExpired
            | AppError::InvalidTimestamp => StatusCode::BAD_REQUEST,
            AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::Misconfigured(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = match &self {
            AppError::MissingFields(fields) => Some(fields.clone()),
            AppError::BadRequest(msg) => Some(msg.clone()),
            AppError::Misconfigured(what) => {
                tracing::error!(missing = what, "Server misconfiguration");
                None
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            AppError::InvalidSignature | AppError::QrExpired | AppError::InvalidTimestamp => None,
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
