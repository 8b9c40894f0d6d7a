// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end backup timeline tests.
//!
//! These drive the real router against a seeded mock activity log and
//! verify the calendar and day-detail views, including site-local day
//! bucketing.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

mod common;

async fn get_json(app: axum::Router, token: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_calendar_for_unseeded_site_is_empty() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    let (status, json) = get_json(app, &token, "/api/sites/42/backups/calendar").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["days"].as_array().unwrap().len(), 0);
    // No backup ever completed
    assert!(json["last_date_available"].is_null());
    assert!(json["oldest_date_available"].is_string());
}

#[tokio::test]
async fn test_calendar_marks_backup_days() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    state.activity_log.seed_site(
        42,
        common::gmt(0.0),
        vec![
            common::make_backup("b1", "2020-03-02T10:00:00Z", 10, 90),
            common::make_event("e1", "rewind__backup_error", "2020-03-03T10:00:00Z", false),
            common::make_event("p1", "post__published", "2020-03-03T12:00:00Z", false),
            common::make_backup("b2", "2020-03-04T10:00:00Z", 12, 100),
        ],
    );

    let (status, json) = get_json(app, &token, "/api/sites/42/backups/calendar").await;
    assert_eq!(status, StatusCode::OK);

    let days = json["days"].as_array().unwrap();
    assert_eq!(days.len(), 3);

    // Ascending date order
    assert_eq!(days[0]["date"], "20200302");
    assert_eq!(days[1]["date"], "20200303");
    assert_eq!(days[2]["date"], "20200304");

    assert_eq!(days[0]["has_completed_backup"], true);
    assert_eq!(days[1]["has_completed_backup"], false);
    assert_eq!(days[1]["has_backup_error"], true);
    assert_eq!(days[1]["events"], 2);

    assert_eq!(json["oldest_date_available"], "2020-03-02T10:00:00");
    assert_eq!(json["last_date_available"], "2020-03-04T10:00:00");
}

#[tokio::test]
async fn test_calendar_buckets_by_site_local_day() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    // 23:02 UTC on March 2 is 09:02 on March 3 under +10
    state.activity_log.seed_site(
        42,
        common::gmt(10.0),
        vec![common::make_backup("b1", "2020-03-02T23:02:10Z", 10, 90)],
    );

    let (status, json) = get_json(app, &token, "/api/sites/42/backups/calendar").await;
    assert_eq!(status, StatusCode::OK);

    let days = json["days"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["date"], "20200303");
}

#[tokio::test]
async fn test_day_detail_partitions_attempts() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    state.activity_log.seed_site(
        42,
        common::gmt(0.0),
        vec![
            common::make_backup("b1", "2020-03-03T02:00:00Z", 12, 100),
            common::make_event("e1", "rewind__backup_error", "2020-03-03T04:00:00Z", false),
            common::make_event("p1", "post__published", "2020-03-03T06:00:00Z", false),
            common::make_backup("prior", "2020-03-02T02:00:00Z", 10, 90),
        ],
    );

    let (status, json) = get_json(app, &token, "/api/sites/42/backups/2020-03-03").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(json["complete"].as_array().unwrap().len(), 1);
    assert_eq!(json["complete"][0]["activity_id"], "b1");
    assert_eq!(json["error"].as_array().unwrap().len(), 1);
    // The full window includes the non-backup event too
    assert_eq!(json["events"].as_array().unwrap().len(), 3);

    // Deltas count the day's content changes
    assert_eq!(json["deltas"]["posts"], 1);
    assert_eq!(json["deltas"]["total"], 1);

    // Meta diff against the prior day's backup
    assert_eq!(json["meta_diff"]["posts"], 2);
    assert_eq!(json["meta_diff"]["uploads"], 10);
}

#[tokio::test]
async fn test_day_detail_empty_day() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    state.activity_log.seed_site(
        42,
        common::gmt(0.0),
        vec![common::make_backup("b1", "2020-03-02T02:00:00Z", 10, 90)],
    );

    let (status, json) = get_json(app, &token, "/api/sites/42/backups/2020-03-05").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(json["complete"].as_array().unwrap().len(), 0);
    assert_eq!(json["error"].as_array().unwrap().len(), 0);
    assert_eq!(json["events"].as_array().unwrap().len(), 0);
    assert_eq!(json["deltas"]["total"], 0);
    assert_eq!(json["meta_diff"]["posts"], 0);
}

#[tokio::test]
async fn test_day_detail_respects_offset_boundary() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    // 05:02 UTC on March 4 is 13:02 local under +8
    state.activity_log.seed_site(
        42,
        common::gmt(8.0),
        vec![common::make_backup("b1", "2020-03-04T05:02:10Z", 10, 90)],
    );

    let (status, json) = get_json(app.clone(), &token, "/api/sites/42/backups/2020-03-04").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["complete"].as_array().unwrap().len(), 1);

    // The previous local day sees nothing
    let (status, json) = get_json(app, &token, "/api/sites/42/backups/2020-03-03").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["complete"].as_array().unwrap().len(), 0);
}
