//! Raw campaign-feed payloads and their mapping into registration events.
//!
//! Custom fields arrive as a loosely-typed name/answer list; the mapping
//! table below is the only place that knows the form's field names.
//! Unmapped names are ignored. A record missing its identity fields is a
//! parse error that fails the whole run: registrations are financially
//! significant and must never be silently dropped.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use membersync_core::error::SyncError;
use membersync_core::registration::RegistrationEvent;

/// Action type kept by the filter; donations and other transaction types
/// are skipped.
const ACTION_TYPE_REGISTRATION: &str = "REGISTRATION";

const FIELD_POSTAL_CODE: &str = "Postal code";
const FIELD_CITY: &str = "City";
const FIELD_PROFESSIONAL: &str = "Are you a professional?";
const FIELD_HOW_HEARD: &str = "How did you hear about us?";
const FIELD_VOLUNTEER: &str = "Would you like to volunteer?";

/// One page of a campaign feed response.
#[derive(Debug, Deserialize)]
pub(crate) struct ActionsResponse {
    #[serde(default)]
    pub data: Vec<RawAction>,
    pub pagination: Option<Pagination>,
}

/// Paging metadata of a feed response. Absent metadata means the response
/// is the only page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Pagination {
    #[serde(default)]
    pub total_pages: u32,
}

impl Pagination {
    /// Total pages of the window, never zero.
    pub(crate) fn page_count(&self) -> u32 {
        self.total_pages.max(1)
    }
}

/// One raw action as returned by the source API. All fields optional at
/// the wire level; requiredness is enforced by the mapping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawAction {
    pub id: Option<i64>,
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<RawCustomField>,
}

/// One loosely-typed custom-field answer.
#[derive(Debug, Deserialize)]
pub(crate) struct RawCustomField {
    pub name: String,
    pub answer: Option<String>,
}

/// Maps raw campaign feed actions into registration events, dropping
/// non-registration actions.
pub(crate) fn parse_actions(
    campaign: &str,
    actions: Vec<RawAction>,
) -> Result<Vec<RegistrationEvent>, SyncError> {
    actions
        .into_iter()
        .filter(|raw| raw.action_type.as_deref() == Some(ACTION_TYPE_REGISTRATION))
        .map(|raw| parse_action(campaign, raw))
        .collect()
}

fn parse_action(campaign: &str, raw: RawAction) -> Result<RegistrationEvent, SyncError> {
    let id = raw
        .id
        .ok_or_else(|| missing_field(campaign, "id"))?
        .to_string();
    let event_date = raw.date.ok_or_else(|| missing_field(campaign, "date"))?;
    let first_name = raw
        .first_name
        .ok_or_else(|| missing_field(campaign, "firstName"))?;
    let last_name = raw
        .last_name
        .ok_or_else(|| missing_field(campaign, "lastName"))?;

    let mut event = RegistrationEvent {
        source_event_id: id,
        event_date,
        first_name,
        last_name,
        // Blank emails are observed from malformed form submissions; the
        // engine skips those events downstream instead of failing here.
        email: raw.email.unwrap_or_default(),
        postal_code: None,
        city: None,
        is_professional: false,
        how_heard_about_us: None,
        volunteer_interest: None,
    };

    for field in raw.custom_fields {
        let answer = field.answer;
        match field.name.as_str() {
            FIELD_POSTAL_CODE => event.postal_code = answer,
            FIELD_CITY => event.city = answer,
            FIELD_PROFESSIONAL => event.is_professional = parse_tri_state(answer.as_deref()),
            FIELD_HOW_HEARD => event.how_heard_about_us = answer,
            FIELD_VOLUNTEER => event.volunteer_interest = answer,
            _ => {}
        }
    }

    Ok(event)
}

/// Normalizes the source's tri-state professional answer ("Yes", "No",
/// absent) to a boolean.
fn parse_tri_state(answer: Option<&str>) -> bool {
    answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("yes"))
}

fn missing_field(campaign: &str, field: &str) -> SyncError {
    SyncError::Parse(format!(
        "campaign {campaign}: registration record is missing required field {field}"
    ))
}
