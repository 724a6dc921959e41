//! Membersync API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use membersync_api::config::Config;
use membersync_api::error::AppError;
use membersync_api::routes;
use membersync_api::state::AppState;
use membersync_core::clock::SystemClock;
use membersync_core::group::ExternalGroup;
use membersync_dates::CalendarPolicy;
use membersync_engine::ReconciliationEngine;
use membersync_groups::{ChatDirectoryClient, DirectoryGroup, MailingListGroup};
use membersync_notify::TransactionalMailer;
use membersync_source::{HelloFormsClient, OAuthTokenProvider};
use membersync_store::schema::ensure_schema;
use membersync_store::{PgMemberStore, PgWatermarkStore};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting membersync API server");

    let config = Config::from_env()?;

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    ensure_schema(&pool).await?;

    // Assemble the production engine.
    let source_tokens = Arc::new(OAuthTokenProvider::new(
        &config.source.token_url,
        &config.source.client_id,
        &config.source.client_secret,
    )?);
    let source = Arc::new(HelloFormsClient::new(
        &config.source.base_url,
        config.source.campaigns.clone(),
        source_tokens,
    )?);
    let directory_tokens = Arc::new(OAuthTokenProvider::new(
        &config.directory.token_url,
        &config.directory.client_id,
        &config.directory.client_secret,
    )?);
    let groups: Vec<Arc<dyn ExternalGroup>> = vec![
        Arc::new(MailingListGroup::new(
            "mailing-list",
            &config.mailing_list.base_url,
            &config.mailing_list.api_key,
            config.mailing_list.list_id,
        )?),
        Arc::new(DirectoryGroup::new(
            "directory",
            &config.directory.base_url,
            &config.directory.group_key,
            directory_tokens,
        )?),
    ];
    let chat = Arc::new(ChatDirectoryClient::new(
        &config.chat.base_url,
        &config.chat.api_token,
    )?);
    let mailer = Arc::new(TransactionalMailer::new(
        &config.mailer.base_url,
        &config.mailer.api_key,
        &config.mailer.sender,
        &config.mailer.recipient,
    )?);
    let engine = ReconciliationEngine::new(
        CalendarPolicy::default(),
        source,
        Arc::new(PgMemberStore::new(pool.clone())),
        Arc::new(PgWatermarkStore::new(pool)),
        groups,
        chat,
        mailer,
    );

    let app_state = AppState::new(
        Arc::new(engine),
        Arc::new(SystemClock),
        config.run_secret.as_str(),
    );

    // Build router.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/reconciliation", routes::reconciliation::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
