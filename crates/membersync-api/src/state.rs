//! Shared application state.

use std::sync::Arc;

use membersync_core::clock::Clock;
use membersync_engine::ReconciliationEngine;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The reconciliation engine.
    pub engine: Arc<ReconciliationEngine>,
    /// Clock used to stamp the start of a triggered run.
    pub clock: Arc<dyn Clock>,
    /// Shared secret expected on the run-trigger endpoint.
    pub run_secret: Arc<str>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        clock: Arc<dyn Clock>,
        run_secret: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            engine,
            clock,
            run_secret: run_secret.into(),
        }
    }
}
