// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance scan validation and record upsert.

use crate::config::Config;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{AttendanceRecord, AttendanceToken};
use crate::services::qr_token::{QrSigner, TokenError};
use crate::time_utils::format_utc_rfc3339_millis;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};

/// A create conflict re-reads once; a second conflict would mean the
/// record appeared and vanished between reads.
const MAX_UPSERT_ATTEMPTS: usize = 2;

/// Result of an accepted scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Record was already `present`; nothing written.
    AlreadyPresent,
    /// Existing record moved to `present`.
    UpdatedToPresent,
    /// New record created as `present`.
    Created,
}

impl ScanOutcome {
    pub fn message(self) -> &'static str {
        match self {
            ScanOutcome::AlreadyPresent => "already_present",
            ScanOutcome::UpdatedToPresent => "updated_to_present",
            ScanOutcome::Created => "created",
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            ScanOutcome::Created => StatusCode::CREATED,
            ScanOutcome::AlreadyPresent | ScanOutcome::UpdatedToPresent => StatusCode::OK,
        }
    }
}

/// Issues QR tokens and turns validated scans into attendance records.
#[derive(Clone)]
pub struct AttendanceService {
    db: FirestoreDb,
    /// `None` when no signing secret is configured
    signer: Option<QrSigner>,
}

impl AttendanceService {
    pub fn new(db: FirestoreDb, signer: Option<QrSigner>) -> Self {
        Self { db, signer }
    }

    /// Build from config. A missing or unusable secret leaves the service
    /// without a signer; every signing request then fails as misconfigured.
    pub fn from_config(config: &Config, db: FirestoreDb) -> Self {
        let signer = config.qr_signing_secret.as_deref().and_then(|secret| {
            QrSigner::new(secret, config.qr_validity_seconds)
                .map_err(|e| tracing::error!(error = %e, "Unusable QR signing secret"))
                .ok()
        });

        if signer.is_none() {
            tracing::warn!("QR_SIGNING_SECRET not set; QR issuance and scanning will fail");
        }

        Self::new(db, signer)
    }

    fn signer(&self) -> Result<&QrSigner, AppError> {
        self.signer
            .as_ref()
            .ok_or(AppError::Misconfigured("QR_SIGNING_SECRET"))
    }

    /// Mint a token for the given member and activity.
    pub fn issue_token(
        &self,
        user_id: &str,
        activity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(AttendanceToken, DateTime<Utc>), AppError> {
        let signer = self.signer()?;
        let token = signer.mint(user_id, activity_id, now)?;
        let expires_at = now.checked_add_signed(signer.validity()).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("QR token expiry overflows at {}", now))
        })?;
        Ok((token, expires_at))
    }

    /// Validate a scanned token and mark the member present.
    ///
    /// The token's fields must already be checked for presence.
    pub async fn validate_scan(
        &self,
        token: &AttendanceToken,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, AppError> {
        let signer = self.signer()?;

        if let Err(err) = signer.verify(token, now) {
            match err {
                TokenError::SignatureMismatch => tracing::warn!(
                    user_id = %token.user_id,
                    activity_id = %token.activity_id,
                    "Security Alert: QR token signature mismatch"
                ),
                _ => tracing::warn!(
                    user_id = %token.user_id,
                    activity_id = %token.activity_id,
                    timestamp = %token.timestamp,
                    error = %err,
                    "Rejected stale QR token"
                ),
            }
            return Err(err.into());
        }

        let outcome = self
            .mark_present(&token.user_id, &token.activity_id, now)
            .await?;

        tracing::info!(
            user_id = %token.user_id,
            activity_id = %token.activity_id,
            outcome = outcome.message(),
            "Attendance scan accepted"
        );

        Ok(outcome)
    }

    /// Upsert the (user, activity) record to `present`.
    pub async fn mark_present(
        &self,
        user_id: &str,
        activity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, AppError> {
        let now = format_utc_rfc3339_millis(now);

        for _ in 0..MAX_UPSERT_ATTEMPTS {
            match self.db.get_attendance(user_id, activity_id).await? {
                Some(record) if record.is_present() => {
                    return Ok(ScanOutcome::AlreadyPresent);
                }
                Some(mut record) => {
                    record.mark_present(&now);
                    self.db.set_attendance(&record).await?;
                    return Ok(ScanOutcome::UpdatedToPresent);
                }
                None => {
                    let record = AttendanceRecord::new_present(user_id, activity_id, &now);
                    if self.db.create_attendance(&record).await? {
                        return Ok(ScanOutcome::Created);
                    }
                    tracing::debug!(
                        user_id,
                        activity_id,
                        "Attendance created concurrently, re-reading"
                    );
                }
            }
        }

        Err(AppError::Database(format!(
            "Attendance record for {}/{} conflicted but could not be read",
            activity_id, user_id
        )))
    }

    /// A member's own attendance records.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        activity_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        self.db
            .list_attendance_for_user(user_id, activity_id, limit)
            .await
    }
}
