//! `PostgreSQL` implementation of the `MemberStore` trait.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use membersync_core::error::SyncError;
use membersync_core::member::{Member, MergeOutcome, normalize_email};
use membersync_core::registration::RegistrationEvent;
use membersync_core::store::MemberStore;

const SELECT_COLUMNS: &str = "id, first_name, last_name, primary_email, additional_emails, \
     postal_code, city, how_heard_about_us, volunteer_interest, \
     first_registration_date, last_registration_date, is_professional, notification_sent";

/// PostgreSQL-backed member store.
///
/// The merge decision itself is the pure
/// [`Member::apply_registration`]; this type owns the lookup, the
/// transaction boundary, and the row mapping.
#[derive(Debug, Clone)]
pub struct PgMemberStore {
    pool: PgPool,
}

impl PgMemberStore {
    /// Creates a new `PgMemberStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds the member owning `email` as primary or additional address,
    /// locking the row for the rest of the transaction.
    async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        email: &str,
    ) -> Result<Option<Member>, SyncError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM members \
             WHERE lower(primary_email) = $1 \
                OR EXISTS (SELECT 1 FROM unnest(additional_emails) AS extra \
                           WHERE lower(extra) = $1) \
             FOR UPDATE"
        );
        let row: Option<MemberRow> = sqlx::query_as(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&mut **tx)
            .await
            .map_err(storage)?;
        Ok(row.map(MemberRow::into_member))
    }

    async fn insert(tx: &mut Transaction<'_, Postgres>, member: &Member) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO members (id, first_name, last_name, primary_email, additional_emails, \
                 postal_code, city, how_heard_about_us, volunteer_interest, \
                 first_registration_date, last_registration_date, is_professional, \
                 notification_sent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(member.id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.primary_email)
        .bind(&member.additional_emails)
        .bind(&member.postal_code)
        .bind(&member.city)
        .bind(&member.how_heard_about_us)
        .bind(&member.volunteer_interest)
        .bind(member.first_registration_date)
        .bind(member.last_registration_date)
        .bind(member.is_professional)
        .bind(member.notification_sent)
        .execute(&mut **tx)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn update(tx: &mut Transaction<'_, Postgres>, member: &Member) -> Result<(), SyncError> {
        sqlx::query(
            "UPDATE members SET first_name = $2, last_name = $3, postal_code = $4, city = $5, \
                 how_heard_about_us = $6, volunteer_interest = $7, \
                 first_registration_date = $8, last_registration_date = $9, \
                 is_professional = $10 \
             WHERE id = $1",
        )
        .bind(member.id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.postal_code)
        .bind(&member.city)
        .bind(&member.how_heard_about_us)
        .bind(&member.volunteer_interest)
        .bind(member.first_registration_date)
        .bind(member.last_registration_date)
        .bind(member.is_professional)
        .execute(&mut **tx)
        .await
        .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl MemberStore for PgMemberStore {
    async fn upsert(
        &self,
        event: &RegistrationEvent,
        dry_run: bool,
    ) -> Result<MergeOutcome, SyncError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let outcome = match Self::find_for_update(&mut tx, &event.email).await? {
            None => {
                if !dry_run {
                    Self::insert(&mut tx, &Member::from_event(event)).await?;
                }
                MergeOutcome::Created
            }
            Some(mut member) => {
                let outcome = member.apply_registration(event);
                if !dry_run && outcome != MergeOutcome::Unchanged {
                    Self::update(&mut tx, &member).await?;
                }
                outcome
            }
        };

        if dry_run {
            tracing::info!(
                email = %event.email,
                source_event_id = %event.source_event_id,
                ?outcome,
                "dry run: skipping member write"
            );
            tx.rollback().await.map_err(storage)?;
        } else {
            tx.commit().await.map_err(storage)?;
        }
        Ok(outcome)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<Member>, SyncError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM members \
             WHERE last_registration_date > $1 \
             ORDER BY last_registration_date ASC"
        );
        let rows: Vec<MemberRow> = sqlx::query_as(&sql)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }

    async fn list_valid_as_of(&self, threshold: DateTime<Utc>) -> Result<Vec<Member>, SyncError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM members \
             WHERE last_registration_date >= $1 \
             ORDER BY last_registration_date ASC"
        );
        let rows: Vec<MemberRow> = sqlx::query_as(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }

    async fn list_older_than(&self, before: DateTime<Utc>) -> Result<Vec<Member>, SyncError> {
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM members WHERE last_registration_date < $1");
        let rows: Vec<MemberRow> = sqlx::query_as(&sql)
            .bind(before)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }

    async fn delete_older_than(&self, before: DateTime<Utc>) -> Result<u64, SyncError> {
        let result = sqlx::query("DELETE FROM members WHERE last_registration_date < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected())
    }

    async fn find_stale_returning_members(
        &self,
        emails: &HashSet<String>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Member>, SyncError> {
        let wanted: Vec<String> = emails.iter().map(|e| normalize_email(e)).collect();
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM members \
             WHERE last_registration_date < $2 \
               AND (lower(primary_email) = ANY($1) \
                    OR EXISTS (SELECT 1 FROM unnest(additional_emails) AS extra \
                               WHERE lower(extra) = ANY($1)))"
        );
        let rows: Vec<MemberRow> = sqlx::query_as(&sql)
            .bind(&wanted)
            .bind(before)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }

    async fn members_pending_notification(&self) -> Result<Vec<Member>, SyncError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM members \
             WHERE notification_sent = FALSE \
             ORDER BY last_registration_date ASC"
        );
        let rows: Vec<MemberRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }

    async fn mark_notified(&self, members: &[Member]) -> Result<(), SyncError> {
        if members.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = members.iter().map(|m| m.id).collect();
        sqlx::query("UPDATE members SET notification_sent = TRUE WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

fn storage(err: sqlx::Error) -> SyncError {
    SyncError::Storage(err.to_string())
}

/// Row shape of the members table.
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    primary_email: String,
    additional_emails: Vec<String>,
    postal_code: Option<String>,
    city: Option<String>,
    how_heard_about_us: Option<String>,
    volunteer_interest: Option<String>,
    first_registration_date: DateTime<Utc>,
    last_registration_date: DateTime<Utc>,
    is_professional: bool,
    notification_sent: bool,
}

impl MemberRow {
    fn into_member(self) -> Member {
        Member {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            primary_email: self.primary_email,
            additional_emails: self.additional_emails,
            postal_code: self.postal_code,
            city: self.city,
            how_heard_about_us: self.how_heard_about_us,
            volunteer_interest: self.volunteer_interest,
            first_registration_date: self.first_registration_date,
            last_registration_date: self.last_registration_date,
            is_professional: self.is_professional,
            notification_sent: self.notification_sent,
        }
    }
}
