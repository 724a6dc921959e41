//! `PostgreSQL` implementation of the `WatermarkStore` trait.
//!
//! The watermark lives as an RFC 3339 string in the `sync_options`
//! key/value table. An unparseable stored value is a fatal parse error:
//! the run must abort before any side effect rather than reprocess an
//! unbounded window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use membersync_core::error::SyncError;
use membersync_core::store::WatermarkStore;

const WATERMARK_KEY: &str = "last_successful_run_start";

/// PostgreSQL-backed watermark store.
#[derive(Debug, Clone)]
pub struct PgWatermarkStore {
    pool: PgPool,
}

impl PgWatermarkStore {
    /// Creates a new `PgWatermarkStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkStore for PgWatermarkStore {
    async fn last_successful_run_start(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        let raw: Option<(String,)> =
            sqlx::query_as("SELECT value FROM sync_options WHERE key = $1")
                .bind(WATERMARK_KEY)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| SyncError::Storage(e.to_string()))?;

        match raw {
            None => Ok(None),
            Some((value,)) => {
                let parsed = DateTime::parse_from_rfc3339(&value).map_err(|e| {
                    SyncError::Parse(format!("corrupt watermark {value:?}: {e}"))
                })?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
        }
    }

    async fn record_run_start(&self, run_start: DateTime<Utc>) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO sync_options (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(WATERMARK_KEY)
        .bind(run_start.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Storage(e.to_string()))?;
        Ok(())
    }
}
