//! Test groups — mock `ExternalGroup` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use membersync_core::error::SyncError;
use membersync_core::group::ExternalGroup;
use membersync_core::registration::RegistrationEvent;

/// An external group that records all `register_member` and
/// `delete_members` calls. `list_members` returns the configured member
/// list on every call.
#[derive(Debug)]
pub struct RecordingGroup {
    name: String,
    members: Mutex<Vec<String>>,
    registered: Mutex<Vec<RegistrationEvent>>,
    deleted: Mutex<Vec<Vec<String>>>,
}

impl RecordingGroup {
    /// Creates a group with the given name and current member list.
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            name: name.into(),
            members: Mutex::new(members),
            registered: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// Events passed to `register_member`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn registered(&self) -> Vec<RegistrationEvent> {
        self.registered.lock().unwrap().clone()
    }

    /// Email batches passed to `delete_members`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deleted(&self) -> Vec<Vec<String>> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExternalGroup for RecordingGroup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_members(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.members.lock().unwrap().clone())
    }

    async fn register_member(&self, event: &RegistrationEvent) -> Result<(), SyncError> {
        self.registered.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn delete_members(&self, emails: &[String]) -> Result<(), SyncError> {
        self.deleted.lock().unwrap().push(emails.to_vec());
        Ok(())
    }
}

/// An external group whose every call fails with an external error.
/// Useful for testing fail-fast behavior mid-batch.
#[derive(Debug)]
pub struct FailingGroup;

#[async_trait]
impl ExternalGroup for FailingGroup {
    fn name(&self) -> &str {
        "failing-group"
    }

    async fn list_members(&self) -> Result<Vec<String>, SyncError> {
        Err(SyncError::external("failing-group", "connection refused"))
    }

    async fn register_member(&self, _event: &RegistrationEvent) -> Result<(), SyncError> {
        Err(SyncError::external("failing-group", "connection refused"))
    }

    async fn delete_members(&self, _emails: &[String]) -> Result<(), SyncError> {
        Err(SyncError::external("failing-group", "connection refused"))
    }
}
