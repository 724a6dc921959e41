//! Team-chat directory capability.

use async_trait::async_trait;

use crate::error::SyncError;

/// Read-only view of the team-chat user directory.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Email addresses of chat accounts that have been deactivated.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] on an unexpected response.
    async fn deactivated_accounts(&self) -> Result<Vec<String>, SyncError>;
}
