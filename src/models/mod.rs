// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod attendance;
pub mod token;

pub use attendance::{AttendanceRecord, AttendanceStatus, SCANNER_VERIFIER};
pub use token::AttendanceToken;
