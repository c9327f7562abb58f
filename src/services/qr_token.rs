// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QR attendance token signing and verification.
//!
//! A token binds `user_id`, `activity_id` and an ISO-8601 `timestamp` with
//! HMAC-SHA256 under a server-held secret. The signed message is the three
//! fields joined with `|`, and the signature travels as lowercase hex.
//!
//! Validation order is signature first, then freshness: a token is fresh
//! when `0 <= now - timestamp <= validity`. Timestamps in the future are
//! reported as expired, same as stale ones.

use crate::error::AppError;
use crate::models::AttendanceToken;
use crate::time_utils::{format_utc_rfc3339_millis, parse_utc_rfc3339};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Token signing/verification errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Missing identifier: {0}")]
    MissingIdentifier(&'static str),

    #[error("Invalid signing key")]
    InvalidKey,

    #[error("Validity window out of range: {0}s")]
    InvalidValidity(i64),

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Token timestamp outside validity window")]
    Expired,

    #[error("Token timestamp is not RFC3339")]
    InvalidTimestamp,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingIdentifier(field) => AppError::MissingFields(field.to_string()),
            TokenError::InvalidKey => AppError::Misconfigured("QR_SIGNING_SECRET"),
            TokenError::InvalidValidity(_) => AppError::Misconfigured("QR_VALIDITY_SECONDS"),
            TokenError::SignatureMismatch => AppError::InvalidSignature,
            TokenError::Expired => AppError::QrExpired,
            TokenError::InvalidTimestamp => AppError::InvalidTimestamp,
        }
    }
}

/// Signs and verifies attendance tokens with a fixed secret and window.
#[derive(Clone)]
pub struct QrSigner {
    /// Keyed MAC state, cloned for each message
    mac: HmacSha256,
    validity: Duration,
}

impl QrSigner {
    pub fn new(secret: &[u8], validity_seconds: i64) -> Result<Self, TokenError> {
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidKey)?;
        let validity = Duration::try_seconds(validity_seconds)
            .filter(|d| *d >= Duration::zero())
            .ok_or(TokenError::InvalidValidity(validity_seconds))?;
        Ok(Self { mac, validity })
    }

    /// Length of the validity window.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    fn digest(&self, user_id: &str, activity_id: &str, timestamp: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(user_id.as_bytes());
        mac.update(b"|");
        mac.update(activity_id.as_bytes());
        mac.update(b"|");
        mac.update(timestamp.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Hex signature over `user_id|activity_id|timestamp`.
    pub fn sign(&self, user_id: &str, activity_id: &str, timestamp: &str) -> String {
        hex::encode(self.digest(user_id, activity_id, timestamp))
    }

    /// Mint a token for `user_id` at `activity_id`, timestamped `now`.
    pub fn mint(
        &self,
        user_id: &str,
        activity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceToken, TokenError> {
        if user_id.is_empty() {
            return Err(TokenError::MissingIdentifier("userId"));
        }
        if activity_id.is_empty() {
            return Err(TokenError::MissingIdentifier("activityId"));
        }

        let timestamp = format_utc_rfc3339_millis(now);
        let signature = self.sign(user_id, activity_id, &timestamp);

        Ok(AttendanceToken {
            user_id: user_id.to_string(),
            activity_id: activity_id.to_string(),
            timestamp,
            signature,
        })
    }

    /// Check the signature in constant time.
    ///
    /// Non-hex input and wrong lengths are mismatches too.
    pub fn verify_signature(&self, token: &AttendanceToken) -> Result<(), TokenError> {
        let provided = hex::decode(&token.signature).map_err(|_| TokenError::SignatureMismatch)?;
        let expected = self.digest(&token.user_id, &token.activity_id, &token.timestamp);

        if bool::from(expected.ct_eq(&provided)) {
            Ok(())
        } else {
            Err(TokenError::SignatureMismatch)
        }
    }

    /// Check that `timestamp` lies within `[now - validity, now]`.
    pub fn check_freshness(
        &self,
        timestamp: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TokenError> {
        let issued_at = parse_utc_rfc3339(timestamp).ok_or(TokenError::InvalidTimestamp)?;
        let age = now.signed_duration_since(issued_at);

        if age < Duration::zero() || age > self.validity {
            return Err(TokenError::Expired);
        }
        Ok(issued_at)
    }

    /// Full check: signature, then freshness.
    pub fn verify(&self, token: &AttendanceToken, now: DateTime<Utc>) -> Result<(), TokenError> {
        self.verify_signature(token)?;
        self.check_freshness(&token.timestamp, now)?;
        Ok(())
    }
}
