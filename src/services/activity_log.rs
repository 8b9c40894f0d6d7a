// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity log API client with per-site snapshot caching.
//!
//! Handles:
//! - Paginated fetching of a site's activity log
//! - Site offset lookup from the settings endpoint
//! - Normalization of raw payloads into canonical [`ActivityEvent`]s
//! - Rate limit detection (429) and token rejection (401)
//!
//! The raw API intermixes timestamp encodings (`published` ISO string on
//! newer versions, `activity_ts` epoch milliseconds on older ones); all of
//! that is resolved here so downstream code sees exactly one shape. A record
//! with no usable timestamp is skipped with a warning, never a hard failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{ActivityEvent, BackupMeta, SiteOffset};

/// Events retained per snapshot (one dashboard page of history).
const MAX_EVENTS: usize = 1000;
/// Events requested per upstream page.
const PAGE_SIZE: usize = 500;

/// Activity log API client.
///
/// Normalized snapshots and site offsets are cached per site; the snapshot
/// cache has a TTL so rapid date navigation re-indexes from memory instead
/// of re-fetching.
#[derive(Clone)]
pub struct ActivityLogService {
    /// None = offline mock (tests)
    client: Option<RemoteClient>,
    snapshot_ttl: Duration,
    snapshots: Arc<DashMap<u64, Snapshot>>,
    site_offsets: Arc<DashMap<u64, SiteOffset>>,
}

#[derive(Clone)]
struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

#[derive(Clone)]
struct Snapshot {
    fetched_at: Instant,
    events: Arc<Vec<ActivityEvent>>,
}

impl ActivityLogService {
    /// Create a client against the configured activity API.
    pub fn new(config: &Config) -> Self {
        Self {
            client: Some(RemoteClient {
                http: reqwest::Client::new(),
                base_url: config.activity_api_url.trim_end_matches('/').to_string(),
                api_token: config.activity_api_token.clone(),
            }),
            snapshot_ttl: Duration::from_secs(config.snapshot_ttl_secs),
            snapshots: Arc::new(DashMap::new()),
            site_offsets: Arc::new(DashMap::new()),
        }
    }

    /// Create an offline client for tests. Sites return no events and a
    /// default offset until seeded with [`ActivityLogService::seed_site`].
    pub fn new_mock() -> Self {
        Self {
            client: None,
            snapshot_ttl: Duration::from_secs(u64::MAX / 2),
            snapshots: Arc::new(DashMap::new()),
            site_offsets: Arc::new(DashMap::new()),
        }
    }

    /// Seed a site's snapshot and offset (mock/test hook).
    pub fn seed_site(&self, site_id: u64, offset: SiteOffset, events: Vec<ActivityEvent>) {
        self.snapshots.insert(
            site_id,
            Snapshot {
                fetched_at: Instant::now(),
                events: Arc::new(events),
            },
        );
        self.site_offsets.insert(site_id, offset);
    }

    /// Get the normalized activity snapshot for a site.
    ///
    /// Serves from cache while fresh; otherwise fetches and normalizes the
    /// full paginated log. The returned list is immutable and shared.
    pub async fn events_for_site(&self, site_id: u64) -> Result<Arc<Vec<ActivityEvent>>, AppError> {
        if let Some(snapshot) = self.snapshots.get(&site_id) {
            if self.client.is_none() || snapshot.fetched_at.elapsed() < self.snapshot_ttl {
                return Ok(snapshot.events.clone());
            }
        }

        let Some(client) = &self.client else {
            // Offline mock, nothing seeded for this site
            return Ok(Arc::new(Vec::new()));
        };

        let events = Arc::new(self.fetch_all_events(client, site_id).await?);
        tracing::debug!(site_id, count = events.len(), "Activity snapshot refreshed");
        self.snapshots.insert(
            site_id,
            Snapshot {
                fetched_at: Instant::now(),
                events: events.clone(),
            },
        );
        Ok(events)
    }

    /// Get the site's timezone/offset configuration.
    ///
    /// Cached after the first lookup; site timezone settings effectively
    /// never change within a process lifetime.
    pub async fn offset_for_site(&self, site_id: u64) -> Result<SiteOffset, AppError> {
        if let Some(offset) = self.site_offsets.get(&site_id) {
            return Ok(offset.clone());
        }

        let Some(client) = &self.client else {
            return Ok(SiteOffset::default());
        };

        let url = format!("{}/sites/{}/settings", client.base_url, site_id);
        let response = client
            .http
            .get(&url)
            .bearer_auth(&client.api_token)
            .send()
            .await
            .map_err(|e| AppError::ActivityApi(e.to_string()))?;
        let settings: RawSiteSettings = check_response_json(response).await?;

        let offset = SiteOffset {
            timezone: settings.timezone_string.filter(|tz| !tz.is_empty()),
            gmt_offset: settings.gmt_offset,
        };
        if let Some(tz) = offset.timezone.as_deref() {
            if tz.parse::<chrono_tz::Tz>().is_err() {
                tracing::warn!(site_id, timezone = tz, "Unrecognized site timezone, treating timestamps as UTC");
            }
        }

        self.site_offsets.insert(site_id, offset.clone());
        Ok(offset)
    }

    /// Fetch every page of the site's activity log, newest first, up to the
    /// snapshot cap.
    async fn fetch_all_events(
        &self,
        client: &RemoteClient,
        site_id: u64,
    ) -> Result<Vec<ActivityEvent>, AppError> {
        let mut events: Vec<ActivityEvent> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let url = format!("{}/sites/{}/activity", client.base_url, site_id);
            let response = client
                .http
                .get(&url)
                .bearer_auth(&client.api_token)
                .query(&[("page", page.to_string()), ("number", PAGE_SIZE.to_string())])
                .send()
                .await
                .map_err(|e| AppError::ActivityApi(e.to_string()))?;

            let raw: RawActivityPage = check_response_json(response).await?;
            let page_len = raw.activities.len();

            events.extend(raw.activities.into_iter().filter_map(normalize_event));

            if page_len < PAGE_SIZE || events.len() >= MAX_EVENTS {
                break;
            }
            page += 1;
        }

        events.truncate(MAX_EVENTS);
        Ok(events)
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Rate limit - the caller's retry policy decides what to do
        if status.as_u16() == 429 {
            tracing::warn!("Activity API rate limit hit (429)");
            return Err(AppError::ActivityApi(
                AppError::ACTIVITY_API_RATE_LIMIT.to_string(),
            ));
        }

        if status.as_u16() == 401 {
            return Err(AppError::ActivityApi(
                AppError::ACTIVITY_API_TOKEN_ERROR.to_string(),
            ));
        }

        return Err(AppError::ActivityApi(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::ActivityApi(format!("JSON parse error: {}", e)))
}

/// One page of the raw activity log response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawActivityPage {
    #[serde(default)]
    pub activities: Vec<RawActivityEvent>,
}

/// Raw activity entry as returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActivityEvent {
    pub activity_id: Option<String>,
    pub name: Option<String>,
    /// ISO-8601 timestamp (newer API versions)
    pub published: Option<String>,
    /// Epoch milliseconds (older API versions)
    pub activity_ts: Option<i64>,
    #[serde(default)]
    pub is_rewindable: bool,
    pub rewind_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<serde_json::Value>,
    pub backup_meta: Option<BackupMeta>,
}

/// Site settings fields relevant to day bucketing.
#[derive(Debug, Clone, Deserialize)]
struct RawSiteSettings {
    timezone_string: Option<String>,
    gmt_offset: Option<f64>,
}

/// Map a raw entry to the canonical event shape.
///
/// Returns `None` (after logging) for records missing an id, a name, or any
/// usable timestamp; a single malformed record never aborts the batch.
fn normalize_event(raw: RawActivityEvent) -> Option<ActivityEvent> {
    let (Some(activity_id), Some(name)) = (raw.activity_id, raw.name) else {
        tracing::warn!("Skipping activity entry without id or name");
        return None;
    };

    let published = parse_timestamp(raw.published.as_deref(), raw.activity_ts);
    let Some(published) = published else {
        tracing::warn!(activity_id = %activity_id, "Skipping activity entry with unusable timestamp");
        return None;
    };

    Some(ActivityEvent {
        activity_id,
        name,
        published,
        is_rewindable: raw.is_rewindable,
        rewind_id: raw.rewind_id,
        summary: raw.summary,
        description: raw.description,
        backup_meta: raw.backup_meta,
    })
}

/// Resolve the canonical UTC instant from whichever encoding is present.
fn parse_timestamp(published: Option<&str>, activity_ts: Option<i64>) -> Option<DateTime<Utc>> {
    if let Some(raw) = published {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    activity_ts.and_then(DateTime::from_timestamp_millis)
}
