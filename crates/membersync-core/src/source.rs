//! Registration source capability traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::registration::RegistrationEvent;

/// Fetches registration events for a time window from the registration
/// source's campaign feeds.
#[async_trait]
pub trait RegistrationSource: Send + Sync {
    /// All registration events in `[from, to]`, concatenated across the
    /// configured campaigns.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RetryExhausted`] when 5xx retries ran out,
    /// [`SyncError::External`] on a non-retryable response, and
    /// [`SyncError::Parse`] on a malformed payload or a record missing
    /// required identity fields.
    async fn fetch_registrations(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RegistrationEvent>, SyncError>;
}

/// Supplies a bearer token for an external API. Implementations handle
/// refresh-token rotation internally and fall back to a full
/// re-authentication when the refresh is rejected. Safe to call once per
/// run.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently valid access token.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when authentication fails.
    async fn access_token(&self) -> Result<String, SyncError>;
}
