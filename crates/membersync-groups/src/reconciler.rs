//! Set-difference reconciliation of external groups.

use std::collections::HashSet;
use std::sync::Arc;

use membersync_core::error::SyncError;
use membersync_core::group::ExternalGroup;
use membersync_core::member::normalize_email;

/// Deletes group members that are no longer in the keep-set.
///
/// The live member list is fetched fresh per group on every call — a
/// stale cache here would cause incorrect deletions. All comparisons are
/// case-insensitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupReconciler;

impl GroupReconciler {
    /// Creates a reconciler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// For each group, deletes exactly `current group members −
    /// members_to_keep`.
    ///
    /// # Errors
    ///
    /// Returns the first group's error; groups processed before it keep
    /// their deletions (redoing them on the next run is a no-op).
    pub async fn reconcile(
        &self,
        members_to_keep: &HashSet<String>,
        groups: &[Arc<dyn ExternalGroup>],
    ) -> Result<(), SyncError> {
        let keep: HashSet<String> = members_to_keep.iter().map(|e| normalize_email(e)).collect();

        for group in groups {
            let current = group.list_members().await?;
            let stale: Vec<String> = current
                .into_iter()
                .filter(|email| !keep.contains(&normalize_email(email)))
                .collect();

            if stale.is_empty() {
                tracing::info!(group = group.name(), "no stale group members");
                continue;
            }
            tracing::info!(
                group = group.name(),
                count = stale.len(),
                "deleting stale group members"
            );
            group.delete_members(&stale).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use membersync_core::group::ExternalGroup;
    use membersync_test_support::RecordingGroup;

    use super::GroupReconciler;

    fn keep(emails: &[&str]) -> HashSet<String> {
        emails.iter().map(|e| (*e).to_owned()).collect()
    }

    #[tokio::test]
    async fn test_deletes_exactly_the_members_not_in_the_keep_set() {
        // Arrange
        let group = Arc::new(RecordingGroup::new(
            "mailing-list",
            vec![
                "keep@mail.com".to_owned(),
                "stale@mail.com".to_owned(),
                "gone@mail.com".to_owned(),
            ],
        ));
        let groups: Vec<Arc<dyn ExternalGroup>> = vec![group.clone()];

        // Act
        GroupReconciler::new()
            .reconcile(&keep(&["keep@mail.com"]), &groups)
            .await
            .unwrap();

        // Assert
        let deleted = group.deleted();
        assert_eq!(deleted.len(), 1);
        assert_eq!(
            deleted[0],
            vec!["stale@mail.com".to_owned(), "gone@mail.com".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_email_comparison_is_case_insensitive() {
        // Arrange
        let group = Arc::new(RecordingGroup::new(
            "directory",
            vec!["SOMEONE@mail.com".to_owned()],
        ));
        let groups: Vec<Arc<dyn ExternalGroup>> = vec![group.clone()];

        // Act
        GroupReconciler::new()
            .reconcile(&keep(&["someone@mail.com"]), &groups)
            .await
            .unwrap();

        // Assert: the differently-cased member is preserved.
        assert!(group.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_no_delete_call_when_nothing_is_stale() {
        // Arrange
        let group = Arc::new(RecordingGroup::new(
            "mailing-list",
            vec!["keep@mail.com".to_owned()],
        ));
        let groups: Vec<Arc<dyn ExternalGroup>> = vec![group.clone()];

        // Act
        GroupReconciler::new()
            .reconcile(&keep(&["keep@mail.com"]), &groups)
            .await
            .unwrap();

        // Assert
        assert!(group.deleted().is_empty());
    }
}
