//! Test mailers — mock `Mailer` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use membersync_core::error::SyncError;
use membersync_core::mailer::{EmailMessage, Mailer};

/// A mailer that records every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    /// Creates a mailer with an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages passed to `send`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), SyncError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A mailer whose every send fails. Useful for asserting that
/// notification state is not updated when the send throws.
#[derive(Debug)]
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), SyncError> {
        Err(SyncError::external("mailer", "smtp relay unavailable"))
    }
}
