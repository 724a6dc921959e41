//! One reconciliation run, start to finish.
//!
//! The run is sequential by design: detection must read the store before
//! the upserts overwrite the staleness signal, each event is fully
//! processed before the next one starts, and the watermark advances only
//! after everything else succeeded. Sub-steps completed before a failure
//! are not rolled back; they are idempotent and safe to redo on the next
//! run, which retries the same window because the watermark did not move.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use membersync_core::chat::ChatDirectory;
use membersync_core::error::SyncError;
use membersync_core::group::ExternalGroup;
use membersync_core::mailer::Mailer;
use membersync_core::member::{Member, normalize_email};
use membersync_core::registration::RegistrationEvent;
use membersync_core::source::RegistrationSource;
use membersync_core::store::{MemberStore, WatermarkStore};
use membersync_dates::CalendarPolicy;
use membersync_groups::GroupReconciler;
use membersync_notify::NotificationService;

/// Counters of one completed run, surfaced to the trigger endpoint and
/// the logs.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    /// Registration events fetched from the source.
    pub fetched_events: usize,
    /// Events skipped because they carried no email address.
    pub skipped_blank_email: usize,
    /// Events upserted into the member store.
    pub upserted: usize,
    /// Previously lapsed members that registered again this run.
    pub returning_members: usize,
    /// Member rows deleted by the annual prune (0 when not due).
    pub pruned_members: u64,
    /// Whether the weekly digest went out this run.
    pub digest_sent: bool,
    /// Current members found with a deactivated chat account.
    pub deactivated_chat_accounts: usize,
}

/// Phases of a run, logged on entry.
#[derive(Debug, Clone, Copy)]
enum RunPhase {
    FetchingWatermark,
    FetchingRegistrations,
    DetectingReturning,
    Upserting,
    Notifying,
    Expiring,
    SendingDigest,
    AuditingChatAccounts,
    PersistingWatermark,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchingWatermark => "fetching_watermark",
            Self::FetchingRegistrations => "fetching_registrations",
            Self::DetectingReturning => "detecting_returning",
            Self::Upserting => "upserting",
            Self::Notifying => "notifying",
            Self::Expiring => "expiring",
            Self::SendingDigest => "sending_digest",
            Self::AuditingChatAccounts => "auditing_chat_accounts",
            Self::PersistingWatermark => "persisting_watermark",
        };
        f.write_str(name)
    }
}

/// Orchestrates one membership reconciliation run.
///
/// All collaborators are injected; the engine never reads the system
/// clock or any ambient state, so a run is fully determined by its
/// arguments and the state of the injected capabilities.
pub struct ReconciliationEngine {
    calendar: CalendarPolicy,
    source: Arc<dyn RegistrationSource>,
    members: Arc<dyn MemberStore>,
    watermark: Arc<dyn WatermarkStore>,
    groups: Vec<Arc<dyn ExternalGroup>>,
    reconciler: GroupReconciler,
    chat: Arc<dyn ChatDirectory>,
    mailer: Arc<dyn Mailer>,
}

impl ReconciliationEngine {
    /// Creates an engine over the given collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        calendar: CalendarPolicy,
        source: Arc<dyn RegistrationSource>,
        members: Arc<dyn MemberStore>,
        watermark: Arc<dyn WatermarkStore>,
        groups: Vec<Arc<dyn ExternalGroup>>,
        chat: Arc<dyn ChatDirectory>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            calendar,
            source,
            members,
            watermark,
            groups,
            reconciler: GroupReconciler::new(),
            chat,
            mailer,
        }
    }

    /// Runs one reconciliation with `now` as the run start.
    ///
    /// With `debug` set the run is read-only: upserts are dry-run, group
    /// mutations, deletions, digest marking, and the watermark write are
    /// logged and skipped, and no email goes out.
    ///
    /// # Errors
    ///
    /// Any fatal error aborts the remainder of the run and propagates;
    /// the watermark is not advanced, so the next run retries the same
    /// window.
    pub async fn run(&self, debug: bool, now: DateTime<Utc>) -> Result<RunSummary, SyncError> {
        // `debug` can't be referenced by name inside the tracing macro: the
        // macro expansion imports `tracing::field::debug`, which shadows it.
        let debug_enabled = debug;
        tracing::info!(%now, debug = debug_enabled, "starting reconciliation run");
        let result = self.execute(debug, now).await;
        match &result {
            Ok(summary) => tracing::info!(?summary, "reconciliation run succeeded"),
            Err(err) => tracing::error!(error = %err, "reconciliation run failed"),
        }
        result
    }

    async fn execute(&self, debug: bool, now: DateTime<Utc>) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::default();
        let notifier = NotificationService::new(Arc::clone(&self.mailer), debug);

        enter(RunPhase::FetchingWatermark);
        let last_run = self
            .watermark
            .last_successful_run_start()
            .await?
            // First deployment: backfill all history. The prune finds an
            // empty store and the digest sends its first edition.
            .unwrap_or(DateTime::UNIX_EPOCH);

        enter(RunPhase::FetchingRegistrations);
        let from = self.calendar.safe_lookback_start(last_run);
        let events = self.source.fetch_registrations(from, now).await?;
        summary.fetched_events = events.len();
        tracing::info!(count = events.len(), %from, to = %now, "fetched registration window");

        // Staleness must be read before the upserts overwrite it.
        enter(RunPhase::DetectingReturning);
        let validity_threshold = self.calendar.validity_threshold(now);
        let batch_emails: HashSet<String> = events
            .iter()
            .filter(|e| !e.has_blank_email())
            .map(|e| e.email.clone())
            .collect();
        let returning = if batch_emails.is_empty() {
            Vec::new()
        } else {
            self.members
                .find_stale_returning_members(&batch_emails, validity_threshold)
                .await?
        };
        summary.returning_members = returning.len();

        enter(RunPhase::Upserting);
        for event in &events {
            self.process_event(event, debug, &mut summary).await?;
        }

        enter(RunPhase::Notifying);
        if returning.is_empty() {
            tracing::info!("no returning members this run");
        } else {
            notifier.notify_returning_members(&returning).await?;
        }

        // Snapshot of currently valid members, taken after the upserts and
        // before any deletion: it feeds both the group keep-set and the
        // chat-account audit. The threshold instant itself is valid, so
        // this is the inclusive listing, not the strict `list_since`.
        let valid_members = self.members.list_valid_as_of(validity_threshold).await?;

        if self.calendar.needs_annual_prune(now, last_run) {
            enter(RunPhase::Expiring);
            summary.pruned_members = self
                .prune_and_reconcile(&valid_members, debug, now)
                .await?;
        }

        if self.calendar.needs_weekly_digest(now, last_run) {
            enter(RunPhase::SendingDigest);
            let pending = self.members.members_pending_notification().await?;
            notifier.notify_weekly_digest(&pending).await?;
            // Marking only after the send did not throw.
            if debug {
                tracing::info!(count = pending.len(), "debug mode: skipping digest marking");
            } else {
                self.members.mark_notified(&pending).await?;
            }
            summary.digest_sent = true;
        }

        enter(RunPhase::AuditingChatAccounts);
        let deactivated = self.chat.deactivated_accounts().await?;
        let valid_emails: HashSet<String> = valid_members
            .iter()
            .flat_map(Member::all_emails)
            .map(|e| normalize_email(&e))
            .collect();
        let overlap: Vec<String> = deactivated
            .into_iter()
            .filter(|email| valid_emails.contains(&normalize_email(email)))
            .collect();
        summary.deactivated_chat_accounts = overlap.len();
        notifier.notify_deactivated_chat_accounts(&overlap).await?;

        enter(RunPhase::PersistingWatermark);
        if debug {
            tracing::info!("debug mode: skipping watermark write");
        } else {
            // The watermark is the run *start*, so the next lookback is
            // anchored to when this run began, not how long it took.
            self.watermark.record_run_start(now).await?;
        }

        Ok(summary)
    }

    /// Upserts one event and registers it into every configured group.
    /// Events are processed one at a time so a mid-batch failure leaves a
    /// consistent, fully processed prefix.
    async fn process_event(
        &self,
        event: &RegistrationEvent,
        debug: bool,
        summary: &mut RunSummary,
    ) -> Result<(), SyncError> {
        if event.has_blank_email() {
            tracing::warn!(
                source_event_id = %event.source_event_id,
                "skipping registration event with blank email"
            );
            summary.skipped_blank_email += 1;
            return Ok(());
        }

        let outcome = self.members.upsert(event, debug).await?;
        tracing::info!(email = %event.email, ?outcome, "upserted registration event");
        summary.upserted += 1;

        for group in &self.groups {
            if debug {
                tracing::info!(
                    group = group.name(),
                    email = %event.email,
                    "debug mode: skipping group registration"
                );
            } else {
                group.register_member(event).await?;
            }
        }
        Ok(())
    }

    /// Deletes expired member rows, then prunes every external group down
    /// to the pre-computed valid snapshot.
    async fn prune_and_reconcile(
        &self,
        valid_members: &[Member],
        debug: bool,
        now: DateTime<Utc>,
    ) -> Result<u64, SyncError> {
        if debug {
            tracing::info!("debug mode: skipping annual prune and group reconciliation");
            return Ok(0);
        }

        let threshold = self.calendar.prune_threshold(now);
        for member in self.members.list_older_than(threshold).await? {
            tracing::info!(email = %member.primary_email, "pruning expired member");
        }
        let pruned = self.members.delete_older_than(threshold).await?;
        tracing::info!(count = pruned, "pruned expired member rows");

        let keep: HashSet<String> = valid_members
            .iter()
            .flat_map(Member::all_emails)
            .collect();
        self.reconciler.reconcile(&keep, &self.groups).await?;
        Ok(pruned)
    }
}

fn enter(phase: RunPhase) {
    tracing::info!(phase = %phase, "entering phase");
}
