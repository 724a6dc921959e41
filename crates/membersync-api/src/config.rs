//! Environment-based configuration.

use crate::error::AppError;

/// Full server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Shared secret expected on the run-trigger endpoint.
    pub run_secret: String,
    /// Registration source settings.
    pub source: SourceConfig,
    /// Mailing-list group settings.
    pub mailing_list: MailingListConfig,
    /// Directory group settings.
    pub directory: DirectoryConfig,
    /// Team-chat directory settings.
    pub chat: ChatConfig,
    /// Transactional mailer settings.
    pub mailer: MailerConfig,
}

/// Registration source API and its OAuth credentials.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the registration source API.
    pub base_url: String,
    /// Campaign identifiers to fetch, in order.
    pub campaigns: Vec<String>,
    /// OAuth token endpoint.
    pub token_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

/// Mailing-list provider API.
#[derive(Debug, Clone)]
pub struct MailingListConfig {
    /// Base URL of the mailing-list API.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Numeric id of the members list.
    pub list_id: i64,
}

/// Directory provider API and its OAuth credentials.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Base URL of the directory API.
    pub base_url: String,
    /// Key of the members group.
    pub group_key: String,
    /// OAuth token endpoint.
    pub token_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

/// Team-chat server API.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL of the chat server.
    pub base_url: String,
    /// Personal access token.
    pub api_token: String,
}

/// Transactional email provider.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Base URL of the transactional-email API.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Sender address.
    pub sender: String,
    /// Administrative recipient address.
    pub recipient: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when a required variable is missing
    /// or unparseable.
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: optional("HOST", "0.0.0.0"),
            port: optional("PORT", "3000")
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            run_secret: required("RUN_SECRET")?,
            source: SourceConfig {
                base_url: required("SOURCE_BASE_URL")?,
                campaigns: parse_campaigns(&required("SOURCE_CAMPAIGNS")?),
                token_url: required("SOURCE_TOKEN_URL")?,
                client_id: required("SOURCE_CLIENT_ID")?,
                client_secret: required("SOURCE_CLIENT_SECRET")?,
            },
            mailing_list: MailingListConfig {
                base_url: required("MAILING_LIST_BASE_URL")?,
                api_key: required("MAILING_LIST_API_KEY")?,
                list_id: required("MAILING_LIST_ID")?.parse().map_err(|e| {
                    AppError::Config(format!("MAILING_LIST_ID must be a valid i64: {e}"))
                })?,
            },
            directory: DirectoryConfig {
                base_url: required("DIRECTORY_BASE_URL")?,
                group_key: required("DIRECTORY_GROUP_KEY")?,
                token_url: required("DIRECTORY_TOKEN_URL")?,
                client_id: required("DIRECTORY_CLIENT_ID")?,
                client_secret: required("DIRECTORY_CLIENT_SECRET")?,
            },
            chat: ChatConfig {
                base_url: required("CHAT_BASE_URL")?,
                api_token: required("CHAT_API_TOKEN")?,
            },
            mailer: MailerConfig {
                base_url: required("MAILER_BASE_URL")?,
                api_key: required("MAILER_API_KEY")?,
                sender: required("MAILER_SENDER")?,
                recipient: required("MAILER_RECIPIENT")?,
            },
        })
    }
}

fn required(name: &str) -> Result<String, AppError> {
    std::env::var(name)
        .map_err(|_| AppError::Config(format!("{name} environment variable must be set")))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Splits a comma-separated campaign list, dropping empty entries.
fn parse_campaigns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
