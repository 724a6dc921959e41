//! Fixed token provider for exercising HTTP clients.

use async_trait::async_trait;

use membersync_core::error::SyncError;
use membersync_core::source::TokenProvider;

/// A `TokenProvider` that hands out the same token on every call.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Creates a provider returning `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, SyncError> {
        Ok(self.token.clone())
    }
}
