//! Persistence capability traits.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::member::{Member, MergeOutcome};
use crate::registration::RegistrationEvent;

/// Durable upsert/query/delete operations over member records, keyed by
/// email.
///
/// Lookups match a member by `primary_email` or by any entry of
/// `additional_emails`, case-insensitively: the additional-emails set
/// exists so one person can register under several addresses, and
/// matching only the primary would split such a person into two members.
///
/// Date comparisons are at full timestamp precision. `list_since` uses a
/// strict `>` boundary and `list_older_than` a strict `<` boundary; the
/// boundary timestamp itself is excluded from both. `list_valid_as_of`
/// alone includes its boundary instant.
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Idempotent, merge-aware upsert of one registration event.
    ///
    /// With `dry_run` set, performs the lookup and returns the merge
    /// decision but issues no write.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn upsert(
        &self,
        event: &RegistrationEvent,
        dry_run: bool,
    ) -> Result<MergeOutcome, SyncError>;

    /// Members whose `last_registration_date` is strictly after `since`,
    /// ascending by `last_registration_date`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<Member>, SyncError>;

    /// Members whose `last_registration_date` is at or after `threshold`,
    /// ascending by `last_registration_date` — the currently valid cohort.
    /// The boundary instant itself counts as valid: a member registered
    /// exactly at the validity threshold has not lapsed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn list_valid_as_of(&self, threshold: DateTime<Utc>) -> Result<Vec<Member>, SyncError>;

    /// Members whose `last_registration_date` is strictly before `before`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn list_older_than(&self, before: DateTime<Utc>) -> Result<Vec<Member>, SyncError>;

    /// Deletes full member rows whose `last_registration_date` is strictly
    /// before `before`. Destructive; used only by the annual prune.
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn delete_older_than(&self, before: DateTime<Utc>) -> Result<u64, SyncError>;

    /// Of the given emails, the members whose stored
    /// `last_registration_date` is strictly before `before` — i.e. they
    /// appear in the current batch (they just registered again) but their
    /// stored record says they had gone stale. This is the
    /// returning-member detection and must run before the new events are
    /// upserted.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn find_stale_returning_members(
        &self,
        emails: &HashSet<String>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Member>, SyncError>;

    /// Members not yet covered by a weekly digest.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn members_pending_notification(&self) -> Result<Vec<Member>, SyncError>;

    /// Marks the given members as covered by the weekly digest.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn mark_notified(&self, members: &[Member]) -> Result<(), SyncError>;
}

/// Persistence of the single run watermark.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// The start time of the last fully successful run, or `None` on a
    /// first deployment.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Parse`] when the persisted value is
    /// unparseable and [`SyncError::Storage`] on database failure.
    async fn last_successful_run_start(&self) -> Result<Option<DateTime<Utc>>, SyncError>;

    /// Records `run_start` as the new watermark. Called only after a run
    /// completed with no unhandled error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] on database failure.
    async fn record_run_start(&self, run_start: DateTime<Utc>) -> Result<(), SyncError>;
}
