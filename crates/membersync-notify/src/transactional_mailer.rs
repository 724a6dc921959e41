//! Transactional-email implementation of the `Mailer` capability.

use std::time::Duration;

use async_trait::async_trait;

use membersync_core::error::SyncError;
use membersync_core::mailer::{EmailMessage, Mailer};

const SERVICE: &str = "mailer";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends administrative email through a transactional-email REST API
/// authenticated by an api-key header.
pub struct TransactionalMailer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    sender: String,
    recipient: String,
}

impl TransactionalMailer {
    /// Creates a mailer delivering to the administrative `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SyncError::external(SERVICE, e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            sender: sender.into(),
            recipient: recipient.into(),
        })
    }
}

#[async_trait]
impl Mailer for TransactionalMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), SyncError> {
        let url = format!("{}/v3/smtp/email", self.base_url);
        let body = serde_json::json!({
            "sender": { "email": self.sender },
            "to": [{ "email": self.recipient }],
            "subject": message.subject,
            "textContent": message.body,
        });
        let response = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::external(SERVICE, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(SyncError::external(
            SERVICE,
            format!("send failed: HTTP {status}: {text}"),
        ))
    }
}
