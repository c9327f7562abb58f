// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod attendance;
pub mod qr_token;

pub use attendance::{AttendanceService, ScanOutcome};
pub use qr_token::{QrSigner, TokenError};
