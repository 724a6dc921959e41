//! In-memory store mocks sharing the production merge semantics.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use membersync_core::error::SyncError;
use membersync_core::member::{Member, MergeOutcome, normalize_email};
use membersync_core::registration::RegistrationEvent;
use membersync_core::store::{MemberStore, WatermarkStore};

/// An in-memory `MemberStore` with the same lookup and merge semantics as
/// the PostgreSQL implementation. Not a stub: engine tests rely on it
/// honoring every boundary rule of the trait contract.
#[derive(Debug, Default)]
pub struct InMemoryMemberStore {
    members: Mutex<Vec<Member>>,
}

impl InMemoryMemberStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `members`.
    #[must_use]
    pub fn with_members(members: Vec<Member>) -> Self {
        Self {
            members: Mutex::new(members),
        }
    }

    /// Snapshot of all stored members.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn members(&self) -> Vec<Member> {
        self.members.lock().unwrap().clone()
    }

    fn matches(member: &Member, email: &str) -> bool {
        let wanted = normalize_email(email);
        normalize_email(&member.primary_email) == wanted
            || member
                .additional_emails
                .iter()
                .any(|e| normalize_email(e) == wanted)
    }
}

#[async_trait]
impl MemberStore for InMemoryMemberStore {
    async fn upsert(
        &self,
        event: &RegistrationEvent,
        dry_run: bool,
    ) -> Result<MergeOutcome, SyncError> {
        let mut members = self.members.lock().unwrap();
        match members.iter_mut().find(|m| Self::matches(m, &event.email)) {
            Some(member) => {
                if dry_run {
                    Ok(member.clone().apply_registration(event))
                } else {
                    Ok(member.apply_registration(event))
                }
            }
            None => {
                if !dry_run {
                    members.push(Member::from_event(event));
                }
                Ok(MergeOutcome::Created)
            }
        }
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<Member>, SyncError> {
        let mut result: Vec<Member> = self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.last_registration_date > since)
            .cloned()
            .collect();
        result.sort_by_key(|m| m.last_registration_date);
        Ok(result)
    }

    async fn list_valid_as_of(&self, threshold: DateTime<Utc>) -> Result<Vec<Member>, SyncError> {
        let mut result: Vec<Member> = self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.last_registration_date >= threshold)
            .cloned()
            .collect();
        result.sort_by_key(|m| m.last_registration_date);
        Ok(result)
    }

    async fn list_older_than(&self, before: DateTime<Utc>) -> Result<Vec<Member>, SyncError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.last_registration_date < before)
            .cloned()
            .collect())
    }

    async fn delete_older_than(&self, before: DateTime<Utc>) -> Result<u64, SyncError> {
        let mut members = self.members.lock().unwrap();
        let before_len = members.len();
        members.retain(|m| m.last_registration_date >= before);
        Ok((before_len - members.len()) as u64)
    }

    async fn find_stale_returning_members(
        &self,
        emails: &HashSet<String>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Member>, SyncError> {
        let wanted: HashSet<String> = emails.iter().map(|e| normalize_email(e)).collect();
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.last_registration_date < before)
            .filter(|m| {
                m.all_emails()
                    .iter()
                    .any(|e| wanted.contains(&normalize_email(e)))
            })
            .cloned()
            .collect())
    }

    async fn members_pending_notification(&self) -> Result<Vec<Member>, SyncError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !m.notification_sent)
            .cloned()
            .collect())
    }

    async fn mark_notified(&self, members: &[Member]) -> Result<(), SyncError> {
        let ids: HashSet<uuid::Uuid> = members.iter().map(|m| m.id).collect();
        for member in self.members.lock().unwrap().iter_mut() {
            if ids.contains(&member.id) {
                member.notification_sent = true;
            }
        }
        Ok(())
    }
}

/// An in-memory `WatermarkStore`.
#[derive(Debug, Default)]
pub struct InMemoryWatermarkStore {
    watermark: Mutex<Option<DateTime<Utc>>>,
}

impl InMemoryWatermarkStore {
    /// Creates a store with no watermark, as on a first deployment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a watermark.
    #[must_use]
    pub fn with_watermark(watermark: DateTime<Utc>) -> Self {
        Self {
            watermark: Mutex::new(Some(watermark)),
        }
    }

    /// The currently stored watermark.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stored(&self) -> Option<DateTime<Utc>> {
        *self.watermark.lock().unwrap()
    }
}

#[async_trait]
impl WatermarkStore for InMemoryWatermarkStore {
    async fn last_successful_run_start(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(*self.watermark.lock().unwrap())
    }

    async fn record_run_start(&self, run_start: DateTime<Utc>) -> Result<(), SyncError> {
        *self.watermark.lock().unwrap() = Some(run_start);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use membersync_core::member::Member;
    use membersync_core::store::MemberStore;

    use super::InMemoryMemberStore;

    fn member(email: &str, last_registration: chrono::DateTime<Utc>) -> Member {
        Member {
            id: Uuid::new_v4(),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            primary_email: email.to_owned(),
            additional_emails: Vec::new(),
            postal_code: None,
            city: None,
            how_heard_about_us: None,
            volunteer_interest: None,
            first_registration_date: last_registration,
            last_registration_date: last_registration,
            is_professional: false,
            notification_sent: false,
        }
    }

    #[tokio::test]
    async fn test_list_since_excludes_the_boundary_and_list_valid_as_of_includes_it() {
        // Arrange: one member strictly after the cutoff, one exactly on
        // it, one strictly before.
        let cutoff = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        let store = InMemoryMemberStore::with_members(vec![
            member("after@mail.com", Utc.with_ymd_and_hms(2019, 3, 1, 0, 0, 0).unwrap()),
            member("on@mail.com", cutoff),
            member("before@mail.com", Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap()),
        ]);

        // Act
        let since: Vec<String> = store
            .list_since(cutoff)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.primary_email)
            .collect();
        let valid: Vec<String> = store
            .list_valid_as_of(cutoff)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.primary_email)
            .collect();

        // Assert
        assert_eq!(since, vec!["after@mail.com"]);
        assert_eq!(valid, vec!["on@mail.com", "after@mail.com"]);
    }
}
