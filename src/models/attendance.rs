// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Attendance record model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// `verifiedBy` value written by the QR scanner endpoint.
pub const SCANNER_VERIFIER: &str = "qr_scanner";

/// Attendance status of a member for one activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// Attendance record stored in Firestore.
///
/// Stored in camelCase; the web app reads the same collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AttendanceRecord {
    /// Firestore document ID the record was read from.
    ///
    /// Only set on reads; records created by the web app may use
    /// auto-generated IDs instead of [`AttendanceRecord::document_id`].
    #[serde(default, alias = "_firestore_id", skip_serializing)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub doc_id: Option<String>,
    /// Member ID
    pub user_id: String,
    /// Activity (event) ID
    pub activity_id: String,
    pub status: AttendanceStatus,
    /// When the scan was accepted (ISO 8601)
    pub timestamp: String,
    /// Who verified the attendance
    pub verified_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AttendanceRecord {
    /// New record for a freshly accepted scan.
    pub fn new_present(user_id: &str, activity_id: &str, now: &str) -> Self {
        Self {
            doc_id: None,
            user_id: user_id.to_string(),
            activity_id: activity_id.to_string(),
            status: AttendanceStatus::Present,
            timestamp: now.to_string(),
            verified_by: SCANNER_VERIFIER.to_string(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.status == AttendanceStatus::Present
    }

    /// Transition to `present` as verified by the scanner.
    ///
    /// `created_at` is kept as-is.
    pub fn mark_present(&mut self, now: &str) {
        self.status = AttendanceStatus::Present;
        self.timestamp = now.to_string();
        self.verified_by = SCANNER_VERIFIER.to_string();
        self.updated_at = now.to_string();
    }

    /// Deterministic document ID for a (user, activity) pair.
    ///
    /// Both parts are percent-encoded, so the `:` separator can't appear
    /// inside either part and distinct pairs never share an ID. The `att:`
    /// prefix keeps IDs out of Firestore's reserved `__.*__` range.
    pub fn document_id(user_id: &str, activity_id: &str) -> String {
        format!(
            "att:{}:{}",
            urlencoding::encode(activity_id),
            urlencoding::encode(user_id)
        )
    }

    /// ID this record is stored under: the one it was read from, else the
    /// deterministic one.
    pub fn storage_id(&self) -> String {
        self.doc_id
            .clone()
            .unwrap_or_else(|| Self::document_id(&self.user_id, &self.activity_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_unambiguous() {
        assert_eq!(AttendanceRecord::document_id("u1", "a1"), "att:a1:u1");
        assert_ne!(
            AttendanceRecord::document_id("b:c", "a"),
            AttendanceRecord::document_id("c", "a:b")
        );
        assert!(!AttendanceRecord::document_id("x/y", "act").contains('/'));
    }

    #[test]
    fn test_document_id_avoids_reserved_names() {
        // Firestore rejects IDs matching `__.*__`.
        let id = AttendanceRecord::document_id("y__", "__x");
        assert!(!(id.starts_with("__") && id.ends_with("__")));
        assert!(id.starts_with("att:"));
    }

    #[test]
    fn test_storage_id_prefers_read_id() {
        let mut record = AttendanceRecord::new_present("u1", "a1", "2025-01-01T00:00:00.000Z");
        assert_eq!(record.storage_id(), "att:a1:u1");

        record.doc_id = Some("Xk2legacyAutoId".to_string());
        assert_eq!(record.storage_id(), "Xk2legacyAutoId");
    }

    #[test]
    fn test_mark_present_keeps_created_at() {
        let mut record = AttendanceRecord::new_present("u1", "a1", "2025-01-01T00:00:00.000Z");
        record.status = AttendanceStatus::Absent;
        record.verified_by = "admin".to_string();

        record.mark_present("2025-01-02T00:00:00.000Z");

        assert!(record.is_present());
        assert_eq!(record.verified_by, SCANNER_VERIFIER);
        assert_eq!(record.created_at, "2025-01-01T00:00:00.000Z");
        assert_eq!(record.updated_at, "2025-01-02T00:00:00.000Z");
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = AttendanceRecord::new_present("u1", "a1", "2025-01-01T00:00:00.000Z");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["activityId"], "a1");
        assert_eq!(json["status"], "present");
        assert_eq!(json["verifiedBy"], SCANNER_VERIFIER);
        assert!(json.get("docId").is_none());
    }

    #[test]
    fn test_reads_firestore_id() {
        let record: AttendanceRecord = serde_json::from_value(serde_json::json!({
            "_firestore_id": "Xk2legacyAutoId",
            "userId": "u1",
            "activityId": "a1",
            "status": "absent",
            "timestamp": "2025-01-01T00:00:00.000Z",
            "verifiedBy": "admin",
            "createdAt": "2025-01-01T00:00:00.000Z",
            "updatedAt": "2025-01-01T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(record.doc_id.as_deref(), Some("Xk2legacyAutoId"));
        assert_eq!(record.status, AttendanceStatus::Absent);
    }
}
