//! Durable member record and the registration merge algorithm.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registration::RegistrationEvent;

/// Durable record of a person's membership.
///
/// Invariants: `primary_email` is never empty and is unique across
/// members; `first_registration_date <= last_registration_date`;
/// `additional_emails` never contains `primary_email` and never duplicates
/// across members. The member exclusively owns its additional-emails set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Surrogate key.
    pub id: Uuid,
    /// First name, from the most recent registration.
    pub first_name: String,
    /// Last name, from the most recent registration.
    pub last_name: String,
    /// Primary identity key of the member.
    pub primary_email: String,
    /// Further addresses this member is reachable at.
    pub additional_emails: Vec<String>,
    /// Postal code, from the most recent registration.
    pub postal_code: Option<String>,
    /// City, from the most recent registration.
    pub city: Option<String>,
    /// "How did you hear about us?", from the most recent registration.
    pub how_heard_about_us: Option<String>,
    /// Volunteering interest, from the most recent registration.
    pub volunteer_interest: Option<String>,
    /// Earliest known registration.
    pub first_registration_date: DateTime<Utc>,
    /// Most recent known registration. Drives validity and expiry.
    pub last_registration_date: DateTime<Utc>,
    /// Whether the member identified as a professional.
    pub is_professional: bool,
    /// Whether the weekly digest has already covered this member.
    pub notification_sent: bool,
}

/// Decision taken by one upsert. Computed by the pure merge so both store
/// implementations share it and dry-run mode can log the decision without
/// writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No member existed for this email; one was created.
    Created,
    /// The event is the newest known registration; descriptive fields and
    /// `last_registration_date` were refreshed.
    RefreshedLatest,
    /// The event predates every known registration; only
    /// `first_registration_date` moved back.
    BackdatedFirst,
    /// The event falls strictly between the known first and last dates;
    /// stored data already reflects a later source state.
    Unchanged,
}

impl Member {
    /// Creates a member from the first registration event seen for an
    /// unseen email.
    #[must_use]
    pub fn from_event(event: &RegistrationEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: event.first_name.clone(),
            last_name: event.last_name.clone(),
            primary_email: event.email.clone(),
            additional_emails: Vec::new(),
            postal_code: event.postal_code.clone(),
            city: event.city.clone(),
            how_heard_about_us: event.how_heard_about_us.clone(),
            volunteer_interest: event.volunteer_interest.clone(),
            first_registration_date: event.event_date,
            last_registration_date: event.event_date,
            is_professional: event.is_professional,
            notification_sent: false,
        }
    }

    /// Merges one registration event into this member.
    ///
    /// Events may arrive out of chronological order across runs with
    /// overlapping fetch windows, so the decision depends only on how the
    /// event date relates to the stored date range:
    ///
    /// - newer than `last_registration_date`: the event is the most
    ///   authoritative source state — descriptive fields are overwritten
    ///   and `last_registration_date` advances;
    /// - older than `first_registration_date`: only
    ///   `first_registration_date` moves back;
    /// - in between: no-op.
    ///
    /// Applying the same event twice therefore yields the same member
    /// state as applying it once.
    pub fn apply_registration(&mut self, event: &RegistrationEvent) -> MergeOutcome {
        if event.event_date > self.last_registration_date {
            self.first_name = event.first_name.clone();
            self.last_name = event.last_name.clone();
            self.postal_code = event.postal_code.clone();
            self.city = event.city.clone();
            self.how_heard_about_us = event.how_heard_about_us.clone();
            self.volunteer_interest = event.volunteer_interest.clone();
            self.is_professional = event.is_professional;
            self.last_registration_date = event.event_date;
            MergeOutcome::RefreshedLatest
        } else if event.event_date < self.first_registration_date {
            self.first_registration_date = event.event_date;
            MergeOutcome::BackdatedFirst
        } else {
            MergeOutcome::Unchanged
        }
    }

    /// All addresses this member is known under: the primary email
    /// followed by the additional ones.
    #[must_use]
    pub fn all_emails(&self) -> Vec<String> {
        let mut emails = Vec::with_capacity(1 + self.additional_emails.len());
        emails.push(self.primary_email.clone());
        emails.extend(self.additional_emails.iter().cloned());
        emails
    }
}

/// Canonical form used for every email comparison: trimmed and
/// lower-cased. The same human has been observed registered under
/// different letter-casing across systems.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Member, MergeOutcome, normalize_email};
    use crate::registration::RegistrationEvent;

    fn event(id: &str, year: i32, first_name: &str) -> RegistrationEvent {
        RegistrationEvent {
            source_event_id: id.to_owned(),
            event_date: Utc.with_ymd_and_hms(year, 6, 15, 12, 0, 0).unwrap(),
            first_name: first_name.to_owned(),
            last_name: "Doe".to_owned(),
            email: "jane@example.org".to_owned(),
            postal_code: Some(format!("750{year}")),
            city: Some("Paris".to_owned()),
            is_professional: false,
            how_heard_about_us: None,
            volunteer_interest: None,
        }
    }

    #[test]
    fn test_from_event_sets_both_registration_dates() {
        // Arrange
        let e = event("1", 2020, "Jane");

        // Act
        let member = Member::from_event(&e);

        // Assert
        assert_eq!(member.first_registration_date, e.event_date);
        assert_eq!(member.last_registration_date, e.event_date);
        assert!(!member.notification_sent);
        assert!(member.additional_emails.is_empty());
    }

    #[test]
    fn test_newer_event_refreshes_descriptive_fields_and_last_date() {
        // Arrange
        let mut member = Member::from_event(&event("1", 2019, "Jane"));
        let newer = event("2", 2021, "Janet");

        // Act
        let outcome = member.apply_registration(&newer);

        // Assert
        assert_eq!(outcome, MergeOutcome::RefreshedLatest);
        assert_eq!(member.first_name, "Janet");
        assert_eq!(member.last_registration_date, newer.event_date);
        assert_eq!(
            member.first_registration_date,
            event("1", 2019, "Jane").event_date
        );
    }

    #[test]
    fn test_older_event_only_backdates_first_registration() {
        // Arrange
        let mut member = Member::from_event(&event("1", 2020, "Jane"));
        let older = event("2", 2017, "Janet");

        // Act
        let outcome = member.apply_registration(&older);

        // Assert
        assert_eq!(outcome, MergeOutcome::BackdatedFirst);
        assert_eq!(member.first_name, "Jane");
        assert_eq!(member.first_registration_date, older.event_date);
        assert_eq!(
            member.last_registration_date,
            event("1", 2020, "Jane").event_date
        );
    }

    #[test]
    fn test_event_between_known_dates_is_a_no_op() {
        // Arrange
        let mut member = Member::from_event(&event("1", 2018, "Jane"));
        member.apply_registration(&event("2", 2022, "Janet"));
        let between = event("3", 2020, "Intruder");

        // Act
        let outcome = member.apply_registration(&between);

        // Assert
        assert_eq!(outcome, MergeOutcome::Unchanged);
        assert_eq!(member.first_name, "Janet");
    }

    #[test]
    fn test_applying_the_same_event_twice_is_idempotent() {
        // Arrange
        let e = event("1", 2020, "Jane");
        let mut once = Member::from_event(&e);
        let mut twice = Member::from_event(&e);

        // Act
        let outcome = twice.apply_registration(&e);

        // Assert
        assert_eq!(outcome, MergeOutcome::Unchanged);
        once.id = twice.id;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_arbitrary_order_converges_on_min_first_max_last_and_latest_fields() {
        // Arrange: the same three events in two different orders.
        let events = [
            event("1", 2019, "A"),
            event("2", 2023, "B"),
            event("3", 2021, "C"),
        ];
        let orders: [[usize; 3]; 2] = [[0, 1, 2], [1, 2, 0]];

        for order in orders {
            // Act
            let mut member = Member::from_event(&events[order[0]]);
            member.apply_registration(&events[order[1]]);
            member.apply_registration(&events[order[2]]);

            // Assert
            assert_eq!(member.first_registration_date, events[0].event_date);
            assert_eq!(member.last_registration_date, events[1].event_date);
            assert_eq!(member.first_name, "B");
        }
    }

    #[test]
    fn test_normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  SOMEONE@Mail.com "), "someone@mail.com");
    }
}
