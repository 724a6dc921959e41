//! Integration tests for the run-trigger endpoint.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_triggered_run_returns_a_summary() {
    let app = common::build_test_app();

    let (status, json) =
        common::post_with_secret(app, "/api/v1/reconciliation/runs", common::RUN_SECRET).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fetched_events"], 0);
    assert_eq!(json["upserted"], 0);
    assert_eq!(json["returning_members"], 0);
    assert_eq!(json["digest_sent"], false);
}

#[tokio::test]
async fn test_triggered_debug_run_returns_a_summary() {
    let app = common::build_test_app();

    let (status, json) = common::post_with_secret(
        app,
        "/api/v1/reconciliation/runs?debug=true",
        common::RUN_SECRET,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fetched_events"], 0);
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let app = common::build_test_app();

    let (status, json) =
        common::post_with_secret(app, "/api/v1/reconciliation/runs", "not-the-secret").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
}
