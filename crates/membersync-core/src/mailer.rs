//! Outbound email capability.

use async_trait::async_trait;

use crate::error::SyncError;

/// One administrative email, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Sends administrative email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers `message` to the configured administrative recipient.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when delivery fails.
    async fn send(&self, message: &EmailMessage) -> Result<(), SyncError>;
}
