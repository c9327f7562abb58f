// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

use crate::error::AppError;
use tokio::sync::OnceCell;

/// Collection names as constants.
pub mod collections {
    /// Attendance records, keyed by (activity, user)
    pub const ATTENDANCE: &str = "attendance";
}

static SHARED_DB: OnceCell<FirestoreDb> = OnceCell::const_new();

/// Process-wide Firestore client, connected on first use.
///
/// Later calls return the same client; `project_id` is only read by the
/// call that performs the connection. A failed connection is not cached.
pub async fn shared(project_id: &str) -> Result<&'static FirestoreDb, AppError> {
    SHARED_DB
        .get_or_try_init(|| FirestoreDb::new(project_id))
        .await
}
