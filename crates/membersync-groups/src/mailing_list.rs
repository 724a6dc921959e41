//! Mailing-list implementation of the `ExternalGroup` capability.
//!
//! Speaks a contacts-style REST API authenticated by an api-key header.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use membersync_core::error::SyncError;
use membersync_core::group::ExternalGroup;
use membersync_core::registration::RegistrationEvent;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 500;

/// Error code the contacts API returns when the address is already a
/// contact. Treated as success: registration is add-or-ignore.
const CODE_DUPLICATE: &str = "duplicate_parameter";

#[derive(Debug, Deserialize)]
struct ContactsPage {
    #[serde(default)]
    contacts: Vec<Contact>,
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct Contact {
    email: String,
}

/// One mailing list mirrored from the member base.
pub struct MailingListGroup {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    list_id: i64,
    name: String,
}

impl MailingListGroup {
    /// Creates a client for one mailing list.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        list_id: i64,
    ) -> Result<Self, SyncError> {
        let name = name.into();
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SyncError::external(&name, e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            list_id,
            name,
        })
    }

    fn error_code(body: &str) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()?
            .get("code")?
            .as_str()
            .map(ToOwned::to_owned)
    }
}

#[async_trait]
impl ExternalGroup for MailingListGroup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_members(&self) -> Result<Vec<String>, SyncError> {
        let mut emails = Vec::new();
        let mut offset = 0u64;
        loop {
            let url = format!(
                "{}/v3/contacts/lists/{}/contacts",
                self.base_url, self.list_id
            );
            let page: ContactsPage = self
                .http
                .get(&url)
                .header("api-key", &self.api_key)
                .query(&[("limit", u64::from(PAGE_SIZE)), ("offset", offset)])
                .send()
                .await
                .map_err(|e| SyncError::external(&self.name, e.to_string()))?
                .error_for_status()
                .map_err(|e| SyncError::external(&self.name, e.to_string()))?
                .json()
                .await
                .map_err(|e| SyncError::Parse(format!("{}: {e}", self.name)))?;

            let fetched = page.contacts.len() as u64;
            emails.extend(page.contacts.into_iter().map(|c| c.email));
            offset += fetched;
            if fetched == 0 || offset >= page.count {
                return Ok(emails);
            }
        }
    }

    async fn register_member(&self, event: &RegistrationEvent) -> Result<(), SyncError> {
        if event.has_blank_email() {
            tracing::warn!(
                group = %self.name,
                source_event_id = %event.source_event_id,
                "skipping registration with blank email"
            );
            return Ok(());
        }

        let url = format!("{}/v3/contacts", self.base_url);
        let body = serde_json::json!({
            "email": event.email,
            "attributes": {
                "FIRSTNAME": event.first_name,
                "LASTNAME": event.last_name,
            },
            "listIds": [self.list_id],
        });
        let response = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::external(&self.name, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        if Self::error_code(&text).as_deref() == Some(CODE_DUPLICATE) {
            tracing::info!(group = %self.name, email = %event.email, "already a contact");
            return Ok(());
        }
        Err(SyncError::external(
            &self.name,
            format!("register {}: HTTP {status}: {text}", event.email),
        ))
    }

    async fn delete_members(&self, emails: &[String]) -> Result<(), SyncError> {
        let url = format!(
            "{}/v3/contacts/lists/{}/contacts/remove",
            self.base_url, self.list_id
        );
        let response = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&serde_json::json!({ "emails": emails }))
            .send()
            .await
            .map_err(|e| SyncError::external(&self.name, e.to_string()))?;

        let status = response.status();
        // 404: none of the addresses were in the list; already removed.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(SyncError::external(
            &self.name,
            format!("delete: HTTP {status}: {text}"),
        ))
    }
}
