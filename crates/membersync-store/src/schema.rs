//! Member store database schema.

use sqlx::PgPool;

use membersync_core::error::SyncError;

/// SQL to create the members table.
pub const CREATE_MEMBERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS members (
    id                      UUID PRIMARY KEY,
    first_name              TEXT NOT NULL,
    last_name               TEXT NOT NULL,
    primary_email           TEXT NOT NULL UNIQUE CHECK (primary_email <> ''),
    additional_emails       TEXT[] NOT NULL DEFAULT '{}',
    postal_code             TEXT,
    city                    TEXT,
    how_heard_about_us      TEXT,
    volunteer_interest      TEXT,
    first_registration_date TIMESTAMPTZ NOT NULL,
    last_registration_date  TIMESTAMPTZ NOT NULL,
    is_professional         BOOLEAN NOT NULL DEFAULT FALSE,
    notification_sent       BOOLEAN NOT NULL DEFAULT FALSE,
    CHECK (first_registration_date <= last_registration_date)
);

CREATE INDEX IF NOT EXISTS idx_members_last_registration_date
    ON members (last_registration_date);
";

/// SQL to create the options table holding the run watermark.
pub const CREATE_SYNC_OPTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sync_options (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Applies the schema idempotently at server startup. The `migrations/`
/// directory carries the same statements for the sqlx migrate tooling.
///
/// # Errors
///
/// Returns [`SyncError::Storage`] on database failure.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), SyncError> {
    for ddl in [CREATE_MEMBERS_TABLE, CREATE_SYNC_OPTIONS_TABLE] {
        sqlx::raw_sql(ddl)
            .execute(pool)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;
    }
    Ok(())
}
