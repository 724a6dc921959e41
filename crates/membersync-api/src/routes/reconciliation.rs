//! Run-trigger endpoint.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

/// Header carrying the shared run secret.
const RUN_SECRET_HEADER: &str = "x-run-secret";

/// Query parameters for POST /runs.
#[derive(Debug, Deserialize)]
pub struct RunQuery {
    /// When set, the run is evaluated read-only.
    #[serde(default)]
    pub debug: bool,
}

/// POST /runs
///
/// Runs are triggered by an external scheduler, not an in-process timer;
/// the secret keeps the endpoint from being a public crawl-and-trigger
/// target.
#[instrument(skip(state, headers))]
async fn trigger_run(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
    headers: HeaderMap,
) -> Response {
    let presented = headers
        .get(RUN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if presented != Some(state.run_secret.as_ref()) {
        warn!("run trigger rejected: missing or invalid secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: "unauthorized",
                message: "missing or invalid run secret".to_owned(),
            }),
        )
            .into_response();
    }

    let now = state.clock.now();
    info!(debug = query.debug, %now, "run triggered");
    match state.engine.run(query.debug, now).await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

/// Returns the router for the reconciliation context.
pub fn router() -> Router<AppState> {
    Router::new().route("/runs", post(trigger_run))
}
