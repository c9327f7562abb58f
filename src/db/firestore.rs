// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Attendance documents live under a deterministic ID built from the
//! (activity, user) pair, so the store holds at most one record per pair.
//! Creation uses a create-only write; a conflict means another scan won.
//! Older records written by the web app under auto-generated IDs are still
//! found by a field query and updated where they are.
//!
//! Two non-Firestore backends exist for tests: an in-memory map and an
//! offline mode where every operation fails.

use crate::db::collections;
use crate::error::AppError;
use crate::models::AttendanceRecord;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use firestore::errors::FirestoreError;
use std::sync::Arc;

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<DashMap<String, AttendanceRecord>>),
    Offline,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// In-memory store for tests. Clones share the same map.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(DashMap::new())),
        }
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_offline() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline_error() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    // ─── Attendance Operations ───────────────────────────────────

    /// Get the attendance record for a (user, activity) pair.
    ///
    /// Looks up the deterministic ID first, then falls back to a field
    /// query for records the web app created under auto-generated IDs.
    pub async fn get_attendance(
        &self,
        user_id: &str,
        activity_id: &str,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let doc_id = AttendanceRecord::document_id(user_id, activity_id);

        match &self.backend {
            Backend::Firestore(client) => {
                let by_key: Option<AttendanceRecord> = client
                    .fluent()
                    .select()
                    .by_id_in(collections::ATTENDANCE)
                    .obj()
                    .one(&doc_id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                if by_key.is_some() {
                    return Ok(by_key);
                }

                let user_id = user_id.to_string();
                let activity_id = activity_id.to_string();
                let legacy: Vec<AttendanceRecord> = client
                    .fluent()
                    .select()
                    .from(collections::ATTENDANCE)
                    .filter(move |q| {
                        q.for_all([
                            q.field("userId").eq(user_id.clone()),
                            q.field("activityId").eq(activity_id.clone()),
                        ])
                    })
                    .limit(1)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok(legacy.into_iter().next())
            }
            Backend::Memory(map) => {
                if let Some(record) = map.get(&doc_id) {
                    return Ok(Some(record.value().clone()));
                }
                Ok(map
                    .iter()
                    .find(|r| r.user_id == user_id && r.activity_id == activity_id)
                    .map(|r| {
                        let mut record = r.value().clone();
                        record.doc_id = Some(r.key().clone());
                        record
                    }))
            }
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    /// Create a record if none exists for its pair.
    ///
    /// Returns `false` without writing when the document already exists.
    pub async fn create_attendance(&self, record: &AttendanceRecord) -> Result<bool, AppError> {
        let doc_id = AttendanceRecord::document_id(&record.user_id, &record.activity_id);

        match &self.backend {
            Backend::Firestore(client) => {
                let result: Result<AttendanceRecord, FirestoreError> = client
                    .fluent()
                    .insert()
                    .into(collections::ATTENDANCE)
                    .document_id(&doc_id)
                    .object(record)
                    .execute()
                    .await;

                match result {
                    Ok(_) => Ok(true),
                    Err(FirestoreError::DataConflictError(_)) => Ok(false),
                    Err(e) => Err(AppError::Database(e.to_string())),
                }
            }
            Backend::Memory(map) => match map.entry(doc_id) {
                Entry::Occupied(_) => Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(record.clone());
                    Ok(true)
                }
            },
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    /// Overwrite the record in place.
    ///
    /// Writes to the ID the record was read from, so updating a record
    /// stored under an auto-generated ID never adds a second one.
    pub async fn set_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let doc_id = record.storage_id();

        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::ATTENDANCE)
                    .document_id(&doc_id)
                    .object(record)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(map) => {
                map.insert(doc_id, record.clone());
                Ok(())
            }
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    /// Get a user's attendance records, most recently updated first.
    pub async fn list_attendance_for_user(
        &self,
        user_id: &str,
        activity_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let user_id = user_id.to_string();
                let activity_id = activity_id.map(str::to_string);

                client
                    .fluent()
                    .select()
                    .from(collections::ATTENDANCE)
                    .filter(move |q| {
                        q.for_all([
                            q.field("userId").eq(user_id.clone()),
                            activity_id
                                .clone()
                                .and_then(|id| q.field("activityId").eq(id)),
                        ])
                    })
                    .order_by([("updatedAt", firestore::FirestoreQueryDirection::Descending)])
                    .limit(limit)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            Backend::Memory(map) => {
                let mut records: Vec<AttendanceRecord> = map
                    .iter()
                    .map(|r| r.value().clone())
                    .filter(|r| r.user_id == user_id)
                    .filter(|r| activity_id.is_none_or(|id| r.activity_id == id))
                    .collect();

                // Timestamps share one format, so string order is time order.
                records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                records.truncate(limit as usize);
                Ok(records)
            }
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    /// Count all stored records (in-memory backend only; used by tests).
    pub fn in_memory_len(&self) -> Option<usize> {
        match &self.backend {
            Backend::Memory(map) => Some(map.len()),
            _ => None,
        }
    }
}
