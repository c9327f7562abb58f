// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated members.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::AttendanceRecord;
use crate::time_utils::format_utc_rfc3339_millis;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/qr-token", get(get_qr_token))
        .route("/api/attendance", get(get_attendance))
}

// ─── QR Token Issuance ───────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct QrTokenQuery {
    #[validate(length(max = 128))]
    activity_id: Option<String>,
}

/// Freshly minted QR token.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QrTokenResponse {
    pub user_id: String,
    pub activity_id: String,
    pub timestamp: String,
    pub signature: String,
    /// When scanners stop accepting this token (ISO 8601)
    pub expires_at: String,
    /// String to encode into the QR image
    pub qr_payload: String,
}

/// Mint a QR token for the signed-in member at the given activity.
///
/// The member ID always comes from the session, so members can only mint
/// tokens for themselves.
async fn get_qr_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<QrTokenQuery>,
) -> Result<Json<QrTokenResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let activity_id = params.activity_id.unwrap_or_default();

    let (token, expires_at) =
        state
            .attendance_service
            .issue_token(&user.user_id, &activity_id, chrono::Utc::now())?;

    let qr_payload = token
        .qr_payload()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("QR payload encoding failed: {}", e)))?;

    tracing::debug!(
        user_id = %token.user_id,
        activity_id = %token.activity_id,
        "Issued QR token"
    );

    Ok(Json(QrTokenResponse {
        user_id: token.user_id,
        activity_id: token.activity_id,
        timestamp: token.timestamp,
        signature: token.signature,
        expires_at: format_utc_rfc3339_millis(expires_at),
        qr_payload,
    }))
}

// ─── Attendance History ──────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct AttendanceQuery {
    /// Only this activity
    #[validate(length(min = 1, max = 128))]
    activity_id: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    50
}

const MAX_LIMIT: u32 = 100;

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AttendanceListResponse {
    pub records: Vec<AttendanceRecord>,
}

/// Get the signed-in member's attendance records.
async fn get_attendance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<AttendanceQuery>,
) -> Result<Json<AttendanceListResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if params.limit == 0 {
        return Err(AppError::BadRequest(
            "Limit must be greater than 0".to_string(),
        ));
    }
    let limit = params.limit.min(MAX_LIMIT);

    let records = state
        .attendance_service
        .list_for_user(&user.user_id, params.activity_id.as_deref(), limit)
        .await?;

    Ok(Json(AttendanceListResponse { records }))
}
