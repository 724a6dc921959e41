//! Team-chat directory client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use membersync_core::chat::ChatDirectory;
use membersync_core::error::SyncError;

const SERVICE: &str = "chat-directory";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
struct ChatUser {
    email: String,
}

/// Read-only client for the team-chat user directory.
pub struct ChatDirectoryClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl ChatDirectoryClient {
    /// Creates a client authenticated by a personal access token.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SyncError::external(SERVICE, e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_token: api_token.into(),
        })
    }
}

#[async_trait]
impl ChatDirectory for ChatDirectoryClient {
    async fn deactivated_accounts(&self) -> Result<Vec<String>, SyncError> {
        let url = format!("{}/api/v4/users", self.base_url);

        let mut emails = Vec::new();
        let mut page = 0u32;
        loop {
            let users: Vec<ChatUser> = self
                .http
                .get(&url)
                .bearer_auth(&self.api_token)
                .query(&[
                    ("inactive", "true".to_owned()),
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .map_err(|e| SyncError::external(SERVICE, e.to_string()))?
                .error_for_status()
                .map_err(|e| SyncError::external(SERVICE, e.to_string()))?
                .json()
                .await
                .map_err(|e| SyncError::Parse(format!("{SERVICE}: {e}")))?;

            if users.is_empty() {
                return Ok(emails);
            }
            emails.extend(users.into_iter().map(|u| u.email));
            page += 1;
        }
    }
}
