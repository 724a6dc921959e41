//! Test chat directory — mock `ChatDirectory` implementation.

use std::sync::Mutex;

use async_trait::async_trait;
use membersync_core::chat::ChatDirectory;
use membersync_core::error::SyncError;

/// A chat directory returning a fixed list of deactivated accounts and
/// counting how often it was queried.
#[derive(Debug)]
pub struct StaticChatDirectory {
    accounts: Vec<String>,
    calls: Mutex<u32>,
}

impl StaticChatDirectory {
    /// Creates a directory reporting `accounts` as deactivated.
    #[must_use]
    pub fn new(accounts: Vec<String>) -> Self {
        Self {
            accounts,
            calls: Mutex::new(0),
        }
    }

    /// Number of `deactivated_accounts` calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ChatDirectory for StaticChatDirectory {
    async fn deactivated_accounts(&self) -> Result<Vec<String>, SyncError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.accounts.clone())
    }
}
