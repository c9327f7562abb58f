// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QR scan validation route.
//!
//! Called by the admin scanner app with the decoded QR payload. The token's
//! HMAC signature is the only credential; no session is required.

use crate::error::{AppError, Result};
use crate::models::AttendanceToken;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Scan routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/validate-scan", post(validate_scan))
}

/// Scanned token as posted by the scanner.
///
/// Every field is optional here so that missing fields come back as a
/// `missing_fields` error instead of a JSON parse failure.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    #[validate(length(max = 128))]
    pub activity_id: Option<String>,
    #[validate(length(max = 64))]
    pub timestamp: Option<String>,
    #[validate(length(max = 128))]
    pub signature: Option<String>,
}

impl ScanRequest {
    /// Names of absent or empty fields, in request order.
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("userId", &self.user_id),
            ("activityId", &self.activity_id),
            ("timestamp", &self.timestamp),
            ("signature", &self.signature),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }

    /// Check presence and bounds, then convert into a token.
    pub fn into_token(self) -> Result<AttendanceToken> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::MissingFields(missing.join(", ")));
        }

        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        match (self.user_id, self.activity_id, self.timestamp, self.signature) {
            (Some(user_id), Some(activity_id), Some(timestamp), Some(signature)) => {
                Ok(AttendanceToken {
                    user_id,
                    activity_id,
                    timestamp,
                    signature,
                })
            }
            _ => Err(AppError::MissingFields("userId, activityId, timestamp, signature".to_string())),
        }
    }
}

/// Successful scan response.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ScanResponse {
    pub ok: bool,
    /// `already_present`, `updated_to_present` or `created`
    pub message: String,
}

/// Validate a scanned QR token and mark the member present.
async fn validate_scan(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ScanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScanResponse>)> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected malformed scan payload");
        AppError::BadRequest("Request body must be a JSON object".to_string())
    })?;

    let token = request.into_token()?;

    let outcome = state
        .attendance_service
        .validate_scan(&token, chrono::Utc::now())
        .await?;

    Ok((
        outcome.status_code(),
        Json(ScanResponse {
            ok: true,
            message: outcome.message().to_string(),
        }),
    ))
}
