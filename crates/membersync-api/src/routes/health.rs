//! Liveness endpoint.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Body of the liveness response.
#[derive(Serialize)]
pub struct HealthBody {
    /// Always `"ok"` when the process can serve requests.
    pub status: &'static str,
    /// Crate version, to check what is deployed.
    pub version: &'static str,
}

async fn health_check() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Router for the unauthenticated liveness check.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
