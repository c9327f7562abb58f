// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read once at startup and cached in memory.

use std::env;

/// Default freshness window for scanned QR tokens.
pub const DEFAULT_QR_VALIDITY_SECONDS: i64 = 300;

/// Longest accepted freshness window (one day).
pub const MAX_QR_VALIDITY_SECONDS: i64 = 24 * 60 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// How long a minted QR token stays valid, in seconds
    pub qr_validity_seconds: i64,

    // --- Secrets ---
    /// HMAC key for QR attendance tokens.
    ///
    /// Optional at startup: a missing secret is reported per request as a
    /// server misconfiguration so the rest of the API keeps working.
    pub qr_signing_secret: Option<Vec<u8>>,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first when present (local development).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            qr_validity_seconds: parse_validity(env::var("QR_VALIDITY_SECONDS").ok())?,

            qr_signing_secret: env::var("QR_SIGNING_SECRET")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(String::into_bytes),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Config for tests: fixed secrets, default window, no network settings.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            qr_validity_seconds: DEFAULT_QR_VALIDITY_SECONDS,
            qr_signing_secret: Some(b"test_qr_secret".to_vec()),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

fn parse_validity(raw: Option<String>) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_QR_VALIDITY_SECONDS);
    };

    match raw.trim().parse::<i64>() {
        Ok(seconds) if (0..=MAX_QR_VALIDITY_SECONDS).contains(&seconds) => Ok(seconds),
        _ => Err(ConfigError::Invalid {
            name: "QR_VALIDITY_SECONDS",
            value: raw,
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
