// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use backup_timeline::config::Config;
use backup_timeline::models::{ActivityEvent, BackupMeta, SiteOffset};
use backup_timeline::routes::create_router;
use backup_timeline::services::ActivityLogService;
use backup_timeline::AppState;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Create a test app with an offline mock activity log service.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let activity_log = ActivityLogService::new_mock();

    let state = Arc::new(AppState {
        config,
        activity_log,
    });

    (create_router(state.clone()), state)
}

/// Mint a session JWT the way the login service would.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64, signing_key: &[u8]) -> String {
    backup_timeline::middleware::auth::create_jwt(user_id, signing_key)
        .expect("Failed to create test JWT")
}

#[allow(dead_code)]
pub fn instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Build a canonical activity event for seeding the mock service.
#[allow(dead_code)]
pub fn make_event(id: &str, name: &str, published: &str, rewindable: bool) -> ActivityEvent {
    ActivityEvent {
        activity_id: id.to_string(),
        name: name.to_string(),
        published: instant(published),
        is_rewindable: rewindable,
        rewind_id: rewindable.then(|| format!("rw_{id}")),
        summary: Some(format!("Event {id}")),
        description: None,
        backup_meta: None,
    }
}

/// A completed full backup carrying content counts.
#[allow(dead_code)]
pub fn make_backup(id: &str, published: &str, posts: i64, uploads: i64) -> ActivityEvent {
    let mut event = make_event(id, "rewind__backup_complete_full", published, true);
    event.backup_meta = Some(BackupMeta {
        posts,
        pages: 0,
        uploads,
        plugins: 0,
        themes: 0,
    });
    event
}

/// Site offset with a raw GMT offset in hours.
#[allow(dead_code)]
pub fn gmt(hours: f64) -> SiteOffset {
    SiteOffset {
        timezone: None,
        gmt_offset: Some(hours),
    }
}
