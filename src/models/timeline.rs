//! Date-bucketed index over a site's activity log.
//!
//! The activity API returns a flat, unordered list of events. Folding it
//! into an [`IndexedActivityLog`] answers "which local days have a backup"
//! and "what is the oldest/most recent backup available" in one pass. The
//! index is ephemeral: it is rebuilt from the raw list on every fetch and
//! never persisted.
//!
//! Day membership is always derived from the *site's* configured offset,
//! never the viewer's timezone.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::models::activity::{ActivityEvent, SiteOffset};
use crate::time_utils::day_key;

/// Content-change activity types counted as post deltas.
const DELTA_POST_TYPES: &[&str] = &["post__published", "post__updated", "post__trashed"];
/// Content-change activity types counted as media deltas.
const DELTA_MEDIA_TYPES: &[&str] = &["attachment__uploaded", "attachment__deleted"];
/// Content-change activity types counted as plugin deltas.
const DELTA_PLUGIN_TYPES: &[&str] = &["plugin__installed", "plugin__updated", "plugin__deleted"];
/// Content-change activity types counted as theme deltas.
const DELTA_THEME_TYPES: &[&str] = &["theme__installed", "theme__deleted"];

/// Derived index of an activity log, keyed by local calendar day.
///
/// Rebuilt from scratch every time the raw event list changes; holds no
/// state across invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedActivityLog {
    /// Events per local day (`YYYYMMDD` key), in source-list order
    pub indexed_log: BTreeMap<String, Vec<ActivityEvent>>,
    /// Earliest local day with a completed or rewindable backup.
    /// Starts at "now" and is only ever lowered.
    pub oldest_date_available: NaiveDateTime,
    /// Latest local day with a completed or rewindable backup.
    /// `None` means no backup ever completed.
    pub last_date_available: Option<NaiveDateTime>,
}

impl IndexedActivityLog {
    /// Fold an event list into a date-bucketed index.
    ///
    /// Events are bucketed in input order with no deduplication; duplicate
    /// activity ids are the upstream API's concern. Only events classified
    /// as completed backups or rewindable move the available-date range.
    pub fn build(events: &[ActivityEvent], offset: &SiteOffset, now: DateTime<Utc>) -> Self {
        let mut indexed_log: BTreeMap<String, Vec<ActivityEvent>> = BTreeMap::new();
        let mut oldest_date_available = offset.apply(now);
        let mut last_date_available: Option<NaiveDateTime> = None;

        for event in events {
            let local = offset.apply(event.published);
            indexed_log
                .entry(day_key(local))
                .or_default()
                .push(event.clone());

            let classification = event.classify();
            if classification.is_completed_backup || classification.is_rewindable {
                if local < oldest_date_available {
                    oldest_date_available = local;
                }
                if last_date_available.is_none_or(|last| local > last) {
                    last_date_available = Some(local);
                }
            }
        }

        Self {
            indexed_log,
            oldest_date_available,
            last_date_available,
        }
    }
}

/// Completed and errored backup attempts on one local day.
#[derive(Debug, Default)]
pub struct BackupAttempts<'a> {
    pub complete: Vec<&'a ActivityEvent>,
    pub error: Vec<&'a ActivityEvent>,
}

/// Partition one local day's events into completed vs errored backup
/// attempts.
///
/// Events that are neither are excluded from both buckets; they remain
/// reachable through [`events_in_daily_backup`].
pub fn backup_attempts_for_date<'a>(
    events: &'a [ActivityEvent],
    offset: &SiteOffset,
    target_day: NaiveDate,
) -> BackupAttempts<'a> {
    let mut attempts = BackupAttempts::default();

    for event in events_on_day(events, offset, target_day) {
        let classification = event.classify();
        if classification.is_completed_backup {
            attempts.complete.push(event);
        } else if classification.is_error_backup {
            attempts.error.push(event);
        }
    }

    attempts
}

/// Every event inside a local day's 24-hour window, in original order.
///
/// Unlike [`backup_attempts_for_date`] this includes events of every type;
/// it backs the "what happened during this backup window" view.
pub fn events_in_daily_backup<'a>(
    events: &'a [ActivityEvent],
    offset: &SiteOffset,
    backup_day: NaiveDate,
) -> Vec<&'a ActivityEvent> {
    events_on_day(events, offset, backup_day).collect()
}

/// Content-change events on one local day, grouped by kind.
#[derive(Debug, Default)]
pub struct DailyBackupDelta<'a> {
    pub posts: Vec<&'a ActivityEvent>,
    pub media: Vec<&'a ActivityEvent>,
    pub plugins: Vec<&'a ActivityEvent>,
    pub themes: Vec<&'a ActivityEvent>,
}

impl DailyBackupDelta<'_> {
    /// Total number of content changes across all groups.
    pub fn total(&self) -> usize {
        self.posts.len() + self.media.len() + self.plugins.len() + self.themes.len()
    }
}

/// Group one local day's content-change events by kind.
///
/// Membership is by exact match against the per-kind allow-lists; anything
/// else (including backup events themselves) is not a delta.
pub fn daily_backup_deltas<'a>(
    events: &'a [ActivityEvent],
    offset: &SiteOffset,
    target_day: NaiveDate,
) -> DailyBackupDelta<'a> {
    let mut delta = DailyBackupDelta::default();

    for event in events_on_day(events, offset, target_day) {
        let name = event.name.as_str();
        if DELTA_POST_TYPES.contains(&name) {
            delta.posts.push(event);
        } else if DELTA_MEDIA_TYPES.contains(&name) {
            delta.media.push(event);
        } else if DELTA_PLUGIN_TYPES.contains(&name) {
            delta.plugins.push(event);
        } else if DELTA_THEME_TYPES.contains(&name) {
            delta.themes.push(event);
        }
    }

    delta
}

/// Per-field difference between two backups' content counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackupMetaDiff {
    pub posts: i64,
    pub pages: i64,
    pub uploads: i64,
    pub plugins: i64,
    pub themes: i64,
}

/// Diff the target day's backup metadata against the nearest preceding
/// completed backup.
///
/// Uses the day's first completed-backup event (source-list order). Missing
/// metadata on either side, or no preceding backup at all, yields a zero
/// diff rather than an error.
pub fn meta_diff_for_daily_backup(
    events: &[ActivityEvent],
    offset: &SiteOffset,
    target_day: NaiveDate,
) -> BackupMetaDiff {
    let current = events.iter().find(|e| {
        e.classify().is_completed_backup && offset.apply(e.published).date() == target_day
    });
    let Some(current) = current else {
        return BackupMetaDiff::default();
    };

    let prior = events
        .iter()
        .filter(|e| e.classify().is_completed_backup && e.published < current.published)
        .max_by_key(|e| e.published);

    match (current.backup_meta, prior.and_then(|p| p.backup_meta)) {
        (Some(cur), Some(prev)) => BackupMetaDiff {
            posts: cur.posts - prev.posts,
            pages: cur.pages - prev.pages,
            uploads: cur.uploads - prev.uploads,
            plugins: cur.plugins - prev.plugins,
            themes: cur.themes - prev.themes,
        },
        _ => BackupMetaDiff::default(),
    }
}

/// Events whose site-local calendar day equals `day`, in original order.
fn events_on_day<'a>(
    events: &'a [ActivityEvent],
    offset: &SiteOffset,
    day: NaiveDate,
) -> impl Iterator<Item = &'a ActivityEvent> {
    let offset = offset.clone();
    events
        .iter()
        .filter(move |e| offset.apply(e.published).date() == day)
}
