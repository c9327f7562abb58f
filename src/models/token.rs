// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed attendance token carried in the QR code.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Attendance token (never persisted).
///
/// The signature is hex HMAC-SHA256 over `user_id|activity_id|timestamp`.
/// Field names are camelCase because the scanner app posts them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AttendanceToken {
    pub user_id: String,
    pub activity_id: String,
    /// ISO-8601 creation time (part of the signed payload)
    pub timestamp: String,
    pub signature: String,
}

impl AttendanceToken {
    /// Compact JSON string the client encodes into the QR image.
    pub fn qr_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
