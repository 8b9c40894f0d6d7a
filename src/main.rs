// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backup-Timeline API Server
//!
//! Serves backup calendar availability and per-day backup detail derived
//! from a site's activity log.

use backup_timeline::{config::Config, services::ActivityLogService, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Backup-Timeline API");

    // Initialize the activity log client
    let activity_log = ActivityLogService::new(&config);
    tracing::info!(
        api = %config.activity_api_url,
        ttl_secs = config.snapshot_ttl_secs,
        "Activity log service initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        activity_log,
    });

    // Build router
    let app = backup_timeline::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("backup_timeline=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
