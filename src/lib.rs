// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Club Attendance: QR-code attendance for the robotics club
//!
//! This crate provides the backend API that mints signed attendance QR
//! tokens for members and validates the tokens scanned at club activities.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::AttendanceService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub attendance_service: AttendanceService,
}

impl AppState {
    pub fn new(config: Config, db: FirestoreDb) -> Self {
        let attendance_service = AttendanceService::from_config(&config, db.clone());
        Self {
            config,
            db,
            attendance_service,
        }
    }
}
