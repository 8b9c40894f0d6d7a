// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Canonical activity log event model and backup classification.
//!
//! The activity API intermixes field names and timestamp encodings across
//! versions; the service layer normalizes everything into [`ActivityEvent`]
//! before any indexing logic runs. Nothing downstream branches on which raw
//! field was present.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity types that represent a completed backup.
pub const BACKUP_COMPLETE_TYPES: &[&str] = &[
    "rewind__backup_complete_full",
    "rewind__backup_complete_initial",
];

/// Activity type for a failed backup attempt.
pub const BACKUP_ERROR_TYPE: &str = "rewind__backup_error";

/// One normalized entry from the site's activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Opaque unique identifier assigned by the activity API
    pub activity_id: String,
    /// Classification tag (e.g. "rewind__backup_complete_full")
    pub name: String,
    /// When the event occurred, always UTC
    pub published: DateTime<Utc>,
    /// Whether this point is a valid restore/download target
    pub is_rewindable: bool,
    /// Identifier correlating the event to a specific backup point
    pub rewind_id: Option<String>,
    /// Human-readable one-line summary
    pub summary: Option<String>,
    /// Structured description tree (display only, opaque to indexing)
    pub description: Option<serde_json::Value>,
    /// Site content counts attached to completed-backup events
    pub backup_meta: Option<BackupMeta>,
}

/// Content counts reported with a completed backup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMeta {
    #[serde(default)]
    pub posts: i64,
    #[serde(default)]
    pub pages: i64,
    #[serde(default)]
    pub uploads: i64,
    #[serde(default)]
    pub plugins: i64,
    #[serde(default)]
    pub themes: i64,
}

/// How an event relates to the backup lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupClassification {
    pub is_completed_backup: bool,
    pub is_error_backup: bool,
    pub is_rewindable: bool,
}

impl ActivityEvent {
    /// Classify this event against the backup type allow-lists.
    ///
    /// Classification is by exact string match; an unrecognized name yields
    /// all-false apart from the pass-through rewindable flag.
    pub fn classify(&self) -> BackupClassification {
        BackupClassification {
            is_completed_backup: BACKUP_COMPLETE_TYPES.contains(&self.name.as_str()),
            is_error_backup: self.name == BACKUP_ERROR_TYPE,
            is_rewindable: self.is_rewindable,
        }
    }
}

/// How to convert a UTC instant into the site's local wall-clock time.
///
/// A recognized IANA timezone name takes precedence over the raw numeric
/// offset when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteOffset {
    /// IANA timezone name (e.g. "Australia/Brisbane"), if configured
    pub timezone: Option<String>,
    /// Raw GMT offset in hours (fractional allowed, e.g. 5.5)
    pub gmt_offset: Option<f64>,
}

impl SiteOffset {
    /// Convert a UTC instant into the site's local wall-clock representation.
    ///
    /// Falls back to identity conversion when the timezone name is
    /// unrecognized or the numeric offset is non-finite or out of range.
    /// Never fails; same inputs always yield the same output.
    pub fn apply(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        if let Some(tz) = self.parsed_timezone() {
            return instant.with_timezone(&tz).naive_local();
        }
        if let Some(fixed) = self.fixed_offset() {
            return instant.with_timezone(&fixed).naive_local();
        }
        instant.naive_utc()
    }

    fn parsed_timezone(&self) -> Option<chrono_tz::Tz> {
        self.timezone
            .as_deref()
            .filter(|name| !name.is_empty())
            .and_then(|name| name.parse().ok())
    }

    fn fixed_offset(&self) -> Option<FixedOffset> {
        let hours = self.gmt_offset.filter(|h| h.is_finite())?;
        FixedOffset::east_opt((hours * 3600.0).round() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn event_named(name: &str, rewindable: bool) -> ActivityEvent {
        ActivityEvent {
            activity_id: "act_1".to_string(),
            name: name.to_string(),
            published: instant("2020-03-02T23:02:10.215+00:00"),
            is_rewindable: rewindable,
            rewind_id: None,
            summary: None,
            description: None,
            backup_meta: None,
        }
    }

    #[test]
    fn test_classify_completed_backup_types() {
        for name in ["rewind__backup_complete_full", "rewind__backup_complete_initial"] {
            let c = event_named(name, true).classify();
            assert!(c.is_completed_backup, "{name} should classify as completed");
            assert!(!c.is_error_backup);
        }
    }

    #[test]
    fn test_classify_error_backup() {
        let c = event_named("rewind__backup_error", false).classify();
        assert!(c.is_error_backup);
        assert!(!c.is_completed_backup);
    }

    #[test]
    fn test_classify_unknown_name_is_all_false() {
        let c = event_named("post__published", false).classify();
        assert!(!c.is_completed_backup);
        assert!(!c.is_error_backup);
        assert!(!c.is_rewindable);
    }

    #[test]
    fn test_classify_no_substring_matching() {
        // Only exact matches count
        let c = event_named("rewind__backup_complete_full_extra", false).classify();
        assert!(!c.is_completed_backup);
    }

    #[test]
    fn test_classify_passes_rewindable_through() {
        assert!(event_named("post__published", true).classify().is_rewindable);
        assert!(!event_named("rewind__backup_complete_full", false)
            .classify()
            .is_rewindable);
    }

    #[test]
    fn test_apply_identity_when_offset_absent() {
        let ts = instant("2020-03-02T23:02:10+00:00");
        let local = SiteOffset::default().apply(ts);
        assert_eq!(local, ts.naive_utc());
    }

    #[test]
    fn test_apply_fixed_offset_shifts_wall_clock() {
        let offset = SiteOffset {
            timezone: None,
            gmt_offset: Some(10.0),
        };
        let local = offset.apply(instant("2020-03-02T23:02:10+00:00"));
        assert_eq!(local.date(), NaiveDate::from_ymd_opt(2020, 3, 3).unwrap());
        assert_eq!(local.hour(), 9);
    }

    #[test]
    fn test_apply_fractional_offset() {
        let offset = SiteOffset {
            timezone: None,
            gmt_offset: Some(5.5),
        };
        let local = offset.apply(instant("2020-03-02T20:00:00+00:00"));
        assert_eq!(local.date(), NaiveDate::from_ymd_opt(2020, 3, 3).unwrap());
        assert_eq!((local.hour(), local.minute()), (1, 30));
    }

    #[test]
    fn test_apply_negative_offset() {
        let offset = SiteOffset {
            timezone: None,
            gmt_offset: Some(-8.0),
        };
        let local = offset.apply(instant("2020-03-03T02:00:00+00:00"));
        assert_eq!(local.date(), NaiveDate::from_ymd_opt(2020, 3, 2).unwrap());
        assert_eq!(local.hour(), 18);
    }

    #[test]
    fn test_apply_fixed_offset_round_trips() {
        // Conversion changes representation, never the instant
        let offset = SiteOffset {
            timezone: None,
            gmt_offset: Some(10.0),
        };
        let ts = instant("2020-03-02T23:02:10+00:00");
        let local = offset.apply(ts);
        let back = local - chrono::Duration::hours(10);
        assert_eq!(back, ts.naive_utc());
    }

    #[test]
    fn test_apply_iana_timezone() {
        let offset = SiteOffset {
            timezone: Some("Australia/Brisbane".to_string()),
            gmt_offset: None,
        };
        // Brisbane is UTC+10 year-round
        let local = offset.apply(instant("2020-03-02T23:02:10+00:00"));
        assert_eq!(local.date(), NaiveDate::from_ymd_opt(2020, 3, 3).unwrap());
        assert_eq!(local.hour(), 9);
    }

    #[test]
    fn test_apply_timezone_wins_over_gmt_offset() {
        let offset = SiteOffset {
            timezone: Some("Australia/Brisbane".to_string()),
            gmt_offset: Some(-5.0),
        };
        let local = offset.apply(instant("2020-03-02T23:02:10+00:00"));
        assert_eq!(local.hour(), 9);
    }

    #[test]
    fn test_apply_unrecognized_timezone_falls_back_to_identity() {
        let offset = SiteOffset {
            timezone: Some("Not/A_Zone".to_string()),
            gmt_offset: None,
        };
        let ts = instant("2020-03-02T23:02:10+00:00");
        assert_eq!(offset.apply(ts), ts.naive_utc());
    }

    #[test]
    fn test_apply_empty_timezone_uses_gmt_offset() {
        let offset = SiteOffset {
            timezone: Some(String::new()),
            gmt_offset: Some(10.0),
        };
        let local = offset.apply(instant("2020-03-02T23:02:10+00:00"));
        assert_eq!(local.hour(), 9);
    }

    #[test]
    fn test_apply_out_of_range_offset_falls_back_to_identity() {
        let ts = instant("2020-03-02T23:02:10+00:00");
        for bad in [f64::NAN, f64::INFINITY, 24.0, -24.0] {
            let offset = SiteOffset {
                timezone: None,
                gmt_offset: Some(bad),
            };
            assert_eq!(offset.apply(ts), ts.naive_utc());
        }
    }
}
