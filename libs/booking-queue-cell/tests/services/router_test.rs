use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use booking_queue_cell::create_booking_queue_router;
use super::SchedulerTestUtils;

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_snapshot_route_lists_both_lanes() {
    let utils = SchedulerTestUtils::new();
    utils.admit(9);
    utils.admit(3);
    utils.admit(4);

    let (status, json) = get_json(create_booking_queue_router(utils.scheduler.clone()), "/snapshot").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["emergency"].as_array().unwrap().len(), 1);
    assert_eq!(json["routine"].as_array().unwrap().len(), 2);
    assert_eq!(json["routine"][0]["entry"]["severity_score"], 4);
    assert_eq!(json["routine"][0]["position"], 1);
}

#[tokio::test]
async fn test_stats_route() {
    let utils = SchedulerTestUtils::new();
    utils.admit(8);

    let (status, json) = get_json(create_booking_queue_router(utils.scheduler.clone()), "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["emergency_len"], 1);
    assert_eq!(json["admitted_total"], 1);
}

#[tokio::test]
async fn test_next_route_on_empty_and_busy_queue() {
    let utils = SchedulerTestUtils::new();

    let (_, empty) = get_json(create_booking_queue_router(utils.scheduler.clone()), "/next").await;
    assert_eq!(empty["available"], false);

    let urgent = utils.admit(10);
    utils.admit(2);

    let (status, json) = get_json(create_booking_queue_router(utils.scheduler.clone()), "/next").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], true);
    assert_eq!(json["entry"]["entry_id"], urgent.entry.entry_id.to_string());
    assert_eq!(json["entry"]["queue_class"], "emergency");
}
