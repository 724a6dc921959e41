//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use membersync_api::routes;
use membersync_api::state::AppState;
use membersync_dates::CalendarPolicy;
use membersync_engine::ReconciliationEngine;
use membersync_test_support::{
    FixedClock, InMemoryMemberStore, InMemoryWatermarkStore, RecordingMailer,
    StaticChatDirectory, StaticRegistrationSource,
};

/// Shared secret configured on the test app.
pub const RUN_SECRET: &str = "integration-test-secret";

/// Build the full app router with an engine over in-memory collaborators
/// and a fixed clock. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> Router {
    let engine = ReconciliationEngine::new(
        CalendarPolicy::default(),
        Arc::new(StaticRegistrationSource::new(Vec::new())),
        Arc::new(InMemoryMemberStore::new()),
        Arc::new(InMemoryWatermarkStore::with_watermark(
            Utc.with_ymd_and_hms(2020, 9, 7, 6, 30, 0).unwrap(),
        )),
        Vec::new(),
        Arc::new(StaticChatDirectory::new(Vec::new())),
        Arc::new(RecordingMailer::new()),
    );
    let clock = Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2020, 9, 8, 6, 30, 0).unwrap(),
    ));
    let app_state = AppState::new(Arc::new(engine), clock, RUN_SECRET);

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/reconciliation", routes::reconciliation::router())
        .with_state(app_state)
}

/// Send a POST request with the given secret header and return the
/// response.
pub async fn post_with_secret(
    app: Router,
    uri: &str,
    secret: &str,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-run-secret", secret)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
