// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `/validate-scan` endpoint tests.
//!
//! Run against the in-memory store, so every status code and record
//! transition is checked without a Firestore emulator.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use club_attendance::config::Config;
use club_attendance::db::FirestoreDb;
use club_attendance::models::{AttendanceRecord, AttendanceStatus};
use club_attendance::services::QrSigner;
use club_attendance::time_utils::format_utc_rfc3339_millis;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, create_test_app_with, scan_request};

/// Signed scan body for a token minted `age` ago.
fn signed_scan(user_id: &str, activity_id: &str, age: Duration) -> Value {
    let config = Config::test_default();
    let signer = QrSigner::new(
        config.qr_signing_secret.as_deref().unwrap(),
        config.qr_validity_seconds,
    )
    .unwrap();

    let timestamp = format_utc_rfc3339_millis(Utc::now() - age);
    json!({
        "userId": user_id,
        "activityId": activity_id,
        "timestamp": timestamp,
        "signature": signer.sign(user_id, activity_id, &timestamp),
    })
}

#[tokio::test]
async fn test_first_scan_creates_record() {
    let (app, state) = create_test_app();

    let response = app
        .oneshot(scan_request(&signed_scan("u1", "a1", Duration::seconds(120))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await,
        json!({ "ok": true, "message": "created" })
    );

    let record = state.db.get_attendance("u1", "a1").await.unwrap().unwrap();
    assert_eq!(record.user_id, "u1");
    assert_eq!(record.activity_id, "a1");
    assert_eq!(record.status, AttendanceStatus::Present);
    assert_eq!(state.db.in_memory_len(), Some(1));
}

#[tokio::test]
async fn test_repeat_scan_already_present() {
    let (app, state) = create_test_app();
    let body = signed_scan("u1", "a1", Duration::seconds(5));

    let first = app.clone().oneshot(scan_request(&body)).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.oneshot(scan_request(&body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        body_json(second).await,
        json!({ "ok": true, "message": "already_present" })
    );

    assert_eq!(state.db.in_memory_len(), Some(1));
}

#[tokio::test]
async fn test_absent_record_updated_to_present() {
    let (app, state) = create_test_app();

    let mut record = AttendanceRecord::new_present("u1", "a1", "2025-01-01T00:00:00.000Z");
    record.status = AttendanceStatus::Absent;
    state.db.set_attendance(&record).await.unwrap();

    let response = app
        .oneshot(scan_request(&signed_scan("u1", "a1", Duration::seconds(1))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "ok": true, "message": "updated_to_present" })
    );

    let record = state.db.get_attendance("u1", "a1").await.unwrap().unwrap();
    assert!(record.is_present());
    assert_eq!(record.created_at, "2025-01-01T00:00:00.000Z");
    assert_eq!(state.db.in_memory_len(), Some(1));
}

#[tokio::test]
async fn test_tampered_fields_unauthorized() {
    for field in ["userId", "activityId", "timestamp"] {
        let (app, state) = create_test_app();
        let mut body = signed_scan("u1", "a1", Duration::seconds(10));

        let mut altered = body[field].as_str().unwrap().to_string();
        // Flip the last character; keeps timestamps parseable.
        let last = altered.pop().unwrap();
        altered.push(if last == 'Z' { 'z' } else { 'x' });
        body[field] = json!(altered);

        let response = app.oneshot(scan_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "field {field}");
        assert_eq!(body_json(response).await["error"], "invalid_signature");
        assert_eq!(state.db.in_memory_len(), Some(0));
    }
}

#[tokio::test]
async fn test_wrong_secret_unauthorized() {
    let (app, _) = create_test_app();
    let timestamp = format_utc_rfc3339_millis(Utc::now());
    let forged = QrSigner::new(b"not-the-secret", 300)
        .unwrap()
        .sign("u1", "a1", &timestamp);

    let response = app
        .oneshot(scan_request(&json!({
            "userId": "u1",
            "activityId": "a1",
            "timestamp": timestamp,
            "signature": forged,
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let (app, state) = create_test_app();

    let response = app
        .oneshot(scan_request(&signed_scan("u1", "a1", Duration::seconds(301))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "qr_expired");
    assert_eq!(state.db.in_memory_len(), Some(0));
}

#[tokio::test]
async fn test_future_token_rejected_as_expired() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(scan_request(&signed_scan("u1", "a1", Duration::seconds(-30))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "qr_expired");
}

#[tokio::test]
async fn test_missing_fields_rejected_before_any_work() {
    // Offline store and no secret: reaching either step would be a 500.
    let mut config = Config::test_default();
    config.qr_signing_secret = None;
    let (app, _) = create_test_app_with(config, FirestoreDb::new_offline());

    let full = signed_scan("u1", "a1", Duration::seconds(1));

    for field in ["userId", "activityId", "timestamp", "signature"] {
        let mut body = full.clone();
        body.as_object_mut().unwrap().remove(field);

        let response = app.clone().oneshot(scan_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "field {field}");

        let json = body_json(response).await;
        assert_eq!(json["error"], "missing_fields");
        assert_eq!(json["details"], field);
    }
}

#[tokio::test]
async fn test_empty_field_counts_as_missing() {
    let (app, _) = create_test_app();
    let mut body = signed_scan("u1", "a1", Duration::seconds(1));
    body["signature"] = json!("");

    let response = app.oneshot(scan_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing_fields");
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/validate-scan")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_missing_secret_is_server_error() {
    let mut config = Config::test_default();
    config.qr_signing_secret = None;
    let (app, _) = create_test_app_with(config, FirestoreDb::new_in_memory());

    let response = app
        .oneshot(scan_request(&signed_scan("u1", "a1", Duration::seconds(1))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "server_misconfigured");
}

#[tokio::test]
async fn test_database_failure_hides_details() {
    let (app, _) = create_test_app_with(Config::test_default(), FirestoreDb::new_offline());

    let response = app
        .oneshot(scan_request(&signed_scan("u1", "a1", Duration::seconds(1))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "internal_error" })
    );
}

#[tokio::test]
async fn test_scan_response_has_security_headers() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(scan_request(&signed_scan("u1", "a1", Duration::seconds(1))))
        .await
        .unwrap();

    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
