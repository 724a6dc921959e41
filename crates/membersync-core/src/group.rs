//! External membership group capability.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::registration::RegistrationEvent;

/// One external membership list (mailing list or directory) that must
/// mirror current valid members. The two production variants differ only
/// in wire protocol; callers never branch on which one they hold.
#[async_trait]
pub trait ExternalGroup: Send + Sync {
    /// Human-readable name of the group, for logs.
    fn name(&self) -> &str;

    /// Email addresses currently present in the group. Always fetched
    /// fresh; staleness here would cause incorrect deletions.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] on an unexpected response.
    async fn list_members(&self) -> Result<Vec<String>, SyncError>;

    /// Adds the registrant to the group. Add-or-ignore-if-present:
    /// "already a member" responses are success. A blank email on the
    /// event is logged and skipped, not fatal.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] on a genuinely unexpected response.
    async fn register_member(&self, event: &RegistrationEvent) -> Result<(), SyncError>;

    /// Removes the given addresses from the group. "Not found" and
    /// "already removed" responses are success.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] on an unexpected response.
    async fn delete_members(&self, emails: &[String]) -> Result<(), SyncError>;
}
