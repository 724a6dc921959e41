//! Directory/group implementation of the `ExternalGroup` capability.
//!
//! Speaks a directory-style REST API (bearer token, page-token
//! pagination). Semantics are identical to the mailing-list variant; only
//! the wire protocol differs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use membersync_core::error::SyncError;
use membersync_core::group::ExternalGroup;
use membersync_core::registration::RegistrationEvent;
use membersync_core::source::TokenProvider;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersPage {
    #[serde(default)]
    members: Vec<DirectoryMember>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectoryMember {
    email: String,
}

/// One directory group mirrored from the member base.
pub struct DirectoryGroup {
    http: reqwest::Client,
    base_url: String,
    group_key: String,
    token_provider: Arc<dyn TokenProvider>,
    name: String,
}

impl DirectoryGroup {
    /// Creates a client for one directory group.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        group_key: impl Into<String>,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, SyncError> {
        let name = name.into();
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SyncError::external(&name, e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            group_key: group_key.into(),
            token_provider,
            name,
        })
    }
}

#[async_trait]
impl ExternalGroup for DirectoryGroup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_members(&self) -> Result<Vec<String>, SyncError> {
        let token = self.token_provider.access_token().await?;
        let url = format!("{}/groups/{}/members", self.base_url, self.group_key);

        let mut emails = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(&[("maxResults", PAGE_SIZE.to_string())]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: MembersPage = request
                .send()
                .await
                .map_err(|e| SyncError::external(&self.name, e.to_string()))?
                .error_for_status()
                .map_err(|e| SyncError::external(&self.name, e.to_string()))?
                .json()
                .await
                .map_err(|e| SyncError::Parse(format!("{}: {e}", self.name)))?;

            emails.extend(page.members.into_iter().map(|m| m.email));
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(emails),
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

        let token = self.token_provider.access_token().await?;
        let url = format!("{}/groups/{}/members", self.base_url, self.group_key);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "email": event.email, "role": "MEMBER" }))
            .send()
            .await
            .map_err(|e| SyncError::external(&self.name, e.to_string()))?;

        let status = response.status();
        // 409: already a member of the group.
        if status.is_success() || status == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(SyncError::external(
            &self.name,
            format!("register {}: HTTP {status}: {text}", event.email),
        ))
    }

    async fn delete_members(&self, emails: &[String]) -> Result<(), SyncError> {
        let token = self.token_provider.access_token().await?;
        for email in emails {
            let url = format!(
                "{}/groups/{}/members/{email}",
                self.base_url, self.group_key
            );
            let response = self
                .http
                .delete(&url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| SyncError::external(&self.name, e.to_string()))?;

            let status = response.status();
            // 404: already removed.
            if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
                continue;
            }
            let text = response.text().await.unwrap_or_default();
            return Err(SyncError::external(
                &self.name,
                format!("delete {email}: HTTP {status}: {text}"),
            ));
        }
        Ok(())
    }
}
