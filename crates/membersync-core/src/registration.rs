//! Registration event value type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized registration/renewal action pulled from the registration
/// source. Immutable; never persisted directly — consumed by
/// [`MemberStore::upsert`](crate::store::MemberStore::upsert).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationEvent {
    /// Unique identifier of the event in the source system. Used for
    /// idempotent dedup.
    pub source_event_id: String,
    /// Source-assigned timestamp of the registration. Drives merge
    /// ordering.
    pub event_date: DateTime<Utc>,
    /// First name as entered on the registration form.
    pub first_name: String,
    /// Last name as entered on the registration form.
    pub last_name: String,
    /// Email address. May be blank: malformed form submissions are
    /// observed in practice and handled by the engine, not the parser.
    pub email: String,
    /// Postal code custom field, when present.
    pub postal_code: Option<String>,
    /// City custom field, when present.
    pub city: Option<String>,
    /// Whether the registrant identified as a professional. Normalized
    /// from the source's tri-state answer at parse time.
    pub is_professional: bool,
    /// "How did you hear about us?" custom field, when present.
    pub how_heard_about_us: Option<String>,
    /// Volunteering-interest custom field, when present.
    pub volunteer_interest: Option<String>,
}

impl RegistrationEvent {
    /// Returns true when the event carries no usable email address.
    #[must_use]
    pub fn has_blank_email(&self) -> bool {
        self.email.trim().is_empty()
    }
}
