//! Domain error types.

use thiserror::Error;

/// Top-level error type for a reconciliation run.
///
/// The taxonomy mirrors the failure classes of the run: a transient
/// external failure that outlived its retry budget, a fatal external
/// response, a malformed payload, a storage failure, and a violated caller
/// precondition. Benign responses from external services (already a
/// member, already removed) are never represented here; the integration
/// crates classify them as success.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A transient (5xx) external failure that exhausted its retry budget.
    #[error("{service}: retries exhausted after {attempts} attempts: {message}")]
    RetryExhausted {
        /// The external service that kept failing.
        service: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last observed failure.
        message: String,
    },

    /// A fatal, non-retryable response from an external service.
    #[error("{service}: {message}")]
    External {
        /// The external service that produced the response.
        service: String,
        /// Description of the unexpected response.
        message: String,
    },

    /// A malformed payload, a missing required field, or a corrupt
    /// persisted value.
    #[error("parse error: {0}")]
    Parse(String),

    /// A database error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A violated caller precondition. Deliberately loud: signals a logic
    /// bug in the caller rather than an environmental failure.
    #[error("precondition violated: {0}")]
    Precondition(String),
}

impl SyncError {
    /// Shorthand for a fatal external error.
    #[must_use]
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::External {
            service: service.into(),
            message: message.into(),
        }
    }
}
