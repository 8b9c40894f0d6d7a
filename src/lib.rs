// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Backup-Timeline: point-in-time backup availability over a site's
//! activity log.
//!
//! This crate provides the backend API that fetches a site's activity log,
//! indexes it by the site's local calendar day, and serves backup calendar
//! availability and per-day backup detail to the dashboard frontend.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::ActivityLogService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub activity_log: ActivityLogService,
}
