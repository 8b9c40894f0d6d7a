// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::activity::ActivityEvent;
use crate::models::timeline::{
    backup_attempts_for_date, daily_backup_deltas, events_in_daily_backup,
    meta_diff_for_daily_backup, IndexedActivityLog,
};
use crate::time_utils::{format_local, format_utc_rfc3339};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sites/{site_id}/activity", get(get_activity_log))
        .route(
            "/api/sites/{site_id}/backups/calendar",
            get(get_backup_calendar),
        )
        .route("/api/sites/{site_id}/backups/{date}", get(get_backup_day))
}

/// One activity event as exposed to the frontend.
#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySummary {
    pub activity_id: String,
    pub name: String,
    pub published: String,
    pub is_rewindable: bool,
    pub rewind_id: Option<String>,
    pub summary: Option<String>,
}

fn summarize(event: &ActivityEvent) -> ActivitySummary {
    ActivitySummary {
        activity_id: event.activity_id.clone(),
        name: event.name.clone(),
        published: format_utc_rfc3339(event.published),
        is_rewindable: event.is_rewindable,
        rewind_id: event.rewind_id.clone(),
        summary: event.summary.clone(),
    }
}

// ─── Activity Listing ────────────────────────────────────────

#[derive(Deserialize)]
struct ActivityQuery {
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    50
}

const MAX_PER_PAGE: u32 = 100;
const CURSOR_PARTS: usize = 2;

/// Position inside a site's activity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActivityCursor {
    offset: usize,
    site_id: u64,
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<ActivityCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor =
                || crate::error::AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let parts: Vec<&str> = decoded_str.split(':').collect();
            if parts.len() != CURSOR_PARTS {
                return Err(invalid_cursor());
            }

            let offset = parts[0].parse::<usize>().map_err(|_| invalid_cursor())?;
            let site_id = parts[1].parse::<u64>().map_err(|_| invalid_cursor())?;

            Ok(ActivityCursor { offset, site_id })
        })
        .transpose()
}

fn encode_cursor(cursor: ActivityCursor) -> String {
    let payload = format!("{}:{}", cursor.offset, cursor.site_id);
    URL_SAFE_NO_PAD.encode(payload)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityLogResponse {
    pub events: Vec<ActivitySummary>,
    pub per_page: u32,
    /// Total number of events in the snapshot.
    pub total: u32,
    pub next_cursor: Option<String>,
}

/// List a site's normalized activity events, in upstream order.
async fn get_activity_log(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<u64>,
    Query(params): Query<ActivityQuery>,
) -> Result<Json<ActivityLogResponse>> {
    tracing::debug!(
        user_id = user.user_id,
        site_id,
        cursor = ?params.cursor,
        per_page = params.per_page,
        "Fetching activity log"
    );

    let limit = params.per_page.min(MAX_PER_PAGE) as usize;
    let cursor = parse_cursor(params.cursor.as_deref())?;

    if let Some(cursor) = cursor {
        if cursor.site_id != site_id {
            return Err(crate::error::AppError::BadRequest(
                "Cursor does not belong to this site".to_string(),
            ));
        }
    }

    let events = state.activity_log.events_for_site(site_id).await?;

    let start = cursor.map(|c| c.offset).unwrap_or(0).min(events.len());
    let end = start.saturating_add(limit).min(events.len());

    let next_cursor = (end < events.len()).then(|| {
        encode_cursor(ActivityCursor {
            offset: end,
            site_id,
        })
    });

    Ok(Json(ActivityLogResponse {
        events: events[start..end].iter().map(summarize).collect(),
        per_page: limit as u32,
        total: events.len() as u32,
        next_cursor,
    }))
}

// ─── Backup Calendar ─────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CalendarDay {
    /// Local calendar day, `YYYYMMDD`
    pub date: String,
    pub events: u32,
    pub has_completed_backup: bool,
    pub has_backup_error: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BackupCalendarResponse {
    /// Days with at least one event, ascending by date
    pub days: Vec<CalendarDay>,
    /// Earliest site-local datetime with a backup available
    pub oldest_date_available: String,
    /// Latest site-local datetime with a backup available.
    /// `null` means no backup ever completed.
    pub last_date_available: Option<String>,
}

/// Availability overview for the date picker: which days carry backups and
/// how far back restores can go.
async fn get_backup_calendar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<u64>,
) -> Result<Json<BackupCalendarResponse>> {
    tracing::debug!(user_id = user.user_id, site_id, "Building backup calendar");

    let events = state.activity_log.events_for_site(site_id).await?;
    let offset = state.activity_log.offset_for_site(site_id).await?;

    let index = IndexedActivityLog::build(&events, &offset, Utc::now());

    let days = index
        .indexed_log
        .iter()
        .map(|(date, bucket)| {
            let mut has_completed_backup = false;
            let mut has_backup_error = false;
            for event in bucket {
                let classification = event.classify();
                has_completed_backup |= classification.is_completed_backup;
                has_backup_error |= classification.is_error_backup;
            }
            CalendarDay {
                date: date.clone(),
                events: bucket.len() as u32,
                has_completed_backup,
                has_backup_error,
            }
        })
        .collect();

    Ok(Json(BackupCalendarResponse {
        days,
        oldest_date_available: format_local(index.oldest_date_available),
        last_date_available: index.last_date_available.map(format_local),
    }))
}

// ─── Backup Day Detail ───────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeltaSummary {
    pub posts: u32,
    pub media: u32,
    pub plugins: u32,
    pub themes: u32,
    pub total: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MetaDiffSummary {
    pub posts: i64,
    pub pages: i64,
    pub uploads: i64,
    pub plugins: i64,
    pub themes: i64,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BackupDayResponse {
    /// Requested site-local day, `YYYY-MM-DD`
    pub date: String,
    /// Completed backup attempts on this day
    pub complete: Vec<ActivitySummary>,
    /// Errored backup attempts on this day
    pub error: Vec<ActivitySummary>,
    /// Every event inside the day's 24-hour window
    pub events: Vec<ActivitySummary>,
    pub deltas: DeltaSummary,
    pub meta_diff: MetaDiffSummary,
}

/// Detail view for one site-local day: backup attempts, the full event
/// window, content deltas, and the metadata diff against the prior backup.
async fn get_backup_day(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((site_id, date)): Path<(u64, String)>,
) -> Result<Json<BackupDayResponse>> {
    let target_day = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        crate::error::AppError::BadRequest(
            "Invalid 'date' parameter: must be YYYY-MM-DD".to_string(),
        )
    })?;

    tracing::debug!(
        user_id = user.user_id,
        site_id,
        date = %target_day,
        "Fetching backup day detail"
    );

    let events = state.activity_log.events_for_site(site_id).await?;
    let offset = state.activity_log.offset_for_site(site_id).await?;

    let attempts = backup_attempts_for_date(&events, &offset, target_day);
    let window = events_in_daily_backup(&events, &offset, target_day);
    let deltas = daily_backup_deltas(&events, &offset, target_day);
    let meta_diff = meta_diff_for_daily_backup(&events, &offset, target_day);

    Ok(Json(BackupDayResponse {
        date,
        complete: attempts.complete.iter().copied().map(summarize).collect(),
        error: attempts.error.iter().copied().map(summarize).collect(),
        events: window.iter().copied().map(summarize).collect(),
        deltas: DeltaSummary {
            posts: deltas.posts.len() as u32,
            media: deltas.media.len() as u32,
            plugins: deltas.plugins.len() as u32,
            themes: deltas.themes.len() as u32,
            total: deltas.total() as u32,
        },
        meta_diff: MetaDiffSummary {
            posts: meta_diff.posts,
            pages: meta_diff.pages,
            uploads: meta_diff.uploads,
            plugins: meta_diff.plugins,
            themes: meta_diff.themes,
        },
    }))
}
