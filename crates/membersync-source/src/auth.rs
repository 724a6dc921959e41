//! OAuth token provider with refresh-token rotation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use membersync_core::error::SyncError;
use membersync_core::source::TokenProvider;

const SERVICE: &str = "registration-source-auth";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

enum GrantFailure {
    /// The authorization server rejected the grant itself (4xx). For a
    /// refresh grant this means the rotated token is no longer honored.
    Rejected(String),
    /// Anything else: transport failure, 5xx, malformed body.
    Other(SyncError),
}

/// Token provider for the registration source's OAuth endpoint.
///
/// Prefers the refresh grant when a refresh token from a previous call is
/// on hand; a rejected refresh falls back to a full client-credentials
/// authentication. The rotated refresh token is kept for the next call.
pub struct OAuthTokenProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: Mutex<Option<String>>,
}

impl OAuthTokenProvider {
    /// Creates a provider for the given token endpoint and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SyncError::external(SERVICE, e.to_string()))?;
        Ok(Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: Mutex::new(None),
        })
    }

    async fn grant(&self, form: &[(&str, &str)]) -> Result<TokenResponse, GrantFailure> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| GrantFailure::Other(SyncError::external(SERVICE, e.to_string())))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(GrantFailure::Rejected(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            return Err(GrantFailure::Other(SyncError::external(
                SERVICE,
                format!("HTTP {status}"),
            )));
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| GrantFailure::Other(SyncError::Parse(e.to_string())))
    }

    async fn full_authentication(&self) -> Result<TokenResponse, SyncError> {
        self.grant(&[
            ("grant_type", "client_credentials"),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
        .await
        .map_err(|failure| match failure {
            GrantFailure::Rejected(message) => SyncError::external(
                SERVICE,
                format!("client credentials rejected: {message}"),
            ),
            GrantFailure::Other(err) => err,
        })
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn access_token(&self) -> Result<String, SyncError> {
        let mut stored = self.refresh_token.lock().await;

        if let Some(refresh) = stored.clone() {
            match self
                .grant(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", &refresh),
                    ("client_id", &self.client_id),
                ])
                .await
            {
                Ok(token) => {
                    *stored = token.refresh_token.or(Some(refresh));
                    return Ok(token.access_token);
                }
                Err(GrantFailure::Rejected(message)) => {
                    tracing::warn!(message, "refresh token rejected; re-authenticating");
                }
                Err(GrantFailure::Other(err)) => return Err(err),
            }
        }

        let token = self.full_authentication().await?;
        *stored = token.refresh_token;
        Ok(token.access_token)
    }
}
