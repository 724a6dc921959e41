//! Registration-source API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use membersync_core::error::SyncError;
use membersync_core::registration::RegistrationEvent;
use membersync_core::source::{RegistrationSource, TokenProvider};

use crate::mapping::{ActionsResponse, Pagination, RawAction, parse_actions};

const SERVICE: &str = "registration-source";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The source is known to be flaky: a 5xx response is retried up to this
/// many times with a fixed pause, so one page costs at most
/// `MAX_RETRIES + 1` requests. Everything else fails fast — the fetch is
/// a read, so blind retries are safe here and only here.
const MAX_RETRIES: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Call volumes are tens to low-hundreds of registrations per window, so
/// requesting the maximum page size normally keeps the fetch to one page;
/// a backfill window can still spill over, and the client follows the
/// response's paging metadata until the window is complete.
const MAX_PAGE_SIZE: u32 = 1000;

/// Client for the payment/registration platform's campaign feeds.
pub struct HelloFormsClient {
    http: reqwest::Client,
    base_url: String,
    campaigns: Vec<String>,
    token_provider: Arc<dyn TokenProvider>,
    retry_delay: Duration,
}

impl HelloFormsClient {
    /// Creates a client for the given campaign feeds. A single campaign
    /// is a valid configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: impl Into<String>,
        campaigns: Vec<String>,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SyncError::external(SERVICE, e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            campaigns,
            token_provider,
            retry_delay: RETRY_DELAY,
        })
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Fetches every page of a campaign's window. Incomplete responses
    /// are never returned: each page is followed until the metadata says
    /// the window is exhausted.
    async fn fetch_campaign(
        &self,
        token: &str,
        campaign: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RawAction>, SyncError> {
        let mut actions = Vec::new();
        let mut page_index = 1u32;
        loop {
            let page = self
                .fetch_page(token, campaign, from, to, page_index)
                .await?;
            let total_pages = page.pagination.as_ref().map_or(1, Pagination::page_count);
            actions.extend(page.data);
            if page_index >= total_pages {
                return Ok(actions);
            }
            page_index += 1;
        }
    }

    async fn fetch_page(
        &self,
        token: &str,
        campaign: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page_index: u32,
    ) -> Result<ActionsResponse, SyncError> {
        let url = format!("{}/v1/campaigns/{campaign}/actions", self.base_url);
        let mut retries = 0u32;
        loop {
            let response = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(&[
                    ("from", from.to_rfc3339()),
                    ("to", to.to_rfc3339()),
                    ("withDetails", "true".to_owned()),
                    ("pageSize", MAX_PAGE_SIZE.to_string()),
                    ("pageIndex", page_index.to_string()),
                ])
                .send()
                .await
                .map_err(|e| SyncError::external(SERVICE, e.to_string()))?;

            let status = response.status();
            if status.is_server_error() {
                tracing::warn!(
                    campaign,
                    retries,
                    status = status.as_u16(),
                    "server error from registration source"
                );
                if retries >= MAX_RETRIES {
                    return Err(SyncError::RetryExhausted {
                        service: SERVICE.to_owned(),
                        attempts: retries + 1,
                        message: format!("HTTP {status}"),
                    });
                }
                retries += 1;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SyncError::external(
                    SERVICE,
                    format!("campaign {campaign}: HTTP {status}: {body}"),
                ));
            }
            return response
                .json::<ActionsResponse>()
                .await
                .map_err(|e| SyncError::Parse(format!("campaign {campaign}: {e}")));
        }
    }
}

#[async_trait]
impl RegistrationSource for HelloFormsClient {
    async fn fetch_registrations(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RegistrationEvent>, SyncError> {
        // One token per fetch, shared across campaigns and retries.
        let token = self.token_provider.access_token().await?;

        // Campaigns are disjoint by construction, so plain concatenation
        // needs no dedup.
        let mut events = Vec::new();
        for campaign in &self.campaigns {
            let actions = self.fetch_campaign(&token, campaign, from, to).await?;
            let batch = parse_actions(campaign, actions)?;
            tracing::info!(campaign, count = batch.len(), "fetched registrations");
            events.extend(batch);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use axum::Json;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};

    use membersync_core::error::SyncError;
    use membersync_core::source::RegistrationSource;
    use membersync_test_support::StaticTokenProvider;

    use super::HelloFormsClient;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> HelloFormsClient {
        HelloFormsClient::new(
            base_url,
            vec!["membership-2020".to_owned()],
            Arc::new(StaticTokenProvider::new("token")),
        )
        .unwrap()
        .with_retry_delay(Duration::from_millis(1))
    }

    fn action(id: i64) -> Value {
        json!({
            "id": id,
            "date": "2020-09-08T06:12:00Z",
            "type": "REGISTRATION",
            "firstName": "Jane",
            "lastName": "Doe",
            "email": format!("member{id}@example.org")
        })
    }

    async fn fetch(client: &HelloFormsClient) -> Result<Vec<String>, SyncError> {
        let from = Utc.with_ymd_and_hms(2020, 9, 7, 5, 30, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2020, 9, 8, 6, 30, 0).unwrap();
        let events = client.fetch_registrations(from, to).await?;
        Ok(events.into_iter().map(|e| e.source_event_id).collect())
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_success() {
        // Arrange: the first two requests fail with 500, the third one
        // answers.
        let hits = Arc::new(AtomicU32::new(0));
        let handler_hits = Arc::clone(&hits);
        let app = Router::new().route(
            "/v1/campaigns/{campaign}/actions",
            get(move || {
                let hits = Arc::clone(&handler_hits);
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    } else {
                        Json(json!({"data": [action(1)]})).into_response()
                    }
                }
            }),
        );
        let base_url = serve(app).await;

        // Act
        let ids = fetch(&client(&base_url)).await.unwrap();

        // Assert
        assert_eq!(ids, vec!["1"]);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_a_persistent_server_error_fails_after_five_retries() {
        // Arrange: the initial request plus five retries, six requests in
        // all, then the fetch gives up.
        let hits = Arc::new(AtomicU32::new(0));
        let handler_hits = Arc::clone(&hits);
        let app = Router::new().route(
            "/v1/campaigns/{campaign}/actions",
            get(move || {
                let hits = Arc::clone(&handler_hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        );
        let base_url = serve(app).await;

        // Act
        let result = fetch(&client(&base_url)).await;

        // Assert
        match result.unwrap_err() {
            SyncError::RetryExhausted { attempts, .. } => assert_eq!(attempts, 6),
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_client_errors_fail_fast_without_retry() {
        // Arrange
        let hits = Arc::new(AtomicU32::new(0));
        let handler_hits = Arc::clone(&hits);
        let app = Router::new().route(
            "/v1/campaigns/{campaign}/actions",
            get(move || {
                let hits = Arc::clone(&handler_hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::FORBIDDEN
                }
            }),
        );
        let base_url = serve(app).await;

        // Act
        let result = fetch(&client(&base_url)).await;

        // Assert
        assert!(matches!(result, Err(SyncError::External { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_a_multi_page_window_is_fetched_completely() {
        // Arrange: two pages; the second must be requested with
        // pageIndex=2 and concatenated after the first.
        let app = Router::new().route(
            "/v1/campaigns/{campaign}/actions",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let body = match params.get("pageIndex").map(String::as_str) {
                    Some("1") => json!({
                        "data": [action(1), action(2)],
                        "pagination": {"pageIndex": 1, "totalPages": 2}
                    }),
                    Some("2") => json!({
                        "data": [action(3)],
                        "pagination": {"pageIndex": 2, "totalPages": 2}
                    }),
                    other => panic!("unexpected pageIndex {other:?}"),
                };
                Json(body)
            }),
        );
        let base_url = serve(app).await;

        // Act
        let ids = fetch(&client(&base_url)).await.unwrap();

        // Assert
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_a_response_without_paging_metadata_is_a_single_page() {
        // Arrange
        let hits = Arc::new(AtomicU32::new(0));
        let handler_hits = Arc::clone(&hits);
        let app = Router::new().route(
            "/v1/campaigns/{campaign}/actions",
            get(move || {
                let hits = Arc::clone(&handler_hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"data": [action(1)]}))
                }
            }),
        );
        let base_url = serve(app).await;

        // Act
        let ids = fetch(&client(&base_url)).await.unwrap();

        // Assert
        assert_eq!(ids, vec!["1"]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
