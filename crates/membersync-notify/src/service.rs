//! Notification assembly and send policy.

use std::sync::Arc;

use membersync_core::error::SyncError;
use membersync_core::mailer::{EmailMessage, Mailer};
use membersync_core::member::Member;

/// Builds and sends the administrative notifications of one run.
///
/// The three notifications have deliberately different empty-input
/// policies:
///
/// - returning members: an empty list is a caller bug and fails loudly;
/// - weekly digest: always sent, an empty week gets its own body;
/// - deactivated chat accounts: an empty list is a silent no-op.
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    debug: bool,
}

impl NotificationService {
    /// Creates a service for one run. With `debug` set, every send is
    /// logged and skipped.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, debug: bool) -> Self {
        Self { mailer, debug }
    }

    /// Notifies the admins that previously lapsed members registered
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Precondition`] when `members` is empty —
    /// callers must pre-check, so that an accidental empty notification
    /// surfaces as a visible logic bug. Returns [`SyncError::External`]
    /// when delivery fails.
    pub async fn notify_returning_members(&self, members: &[Member]) -> Result<(), SyncError> {
        if members.is_empty() {
            return Err(SyncError::Precondition(
                "returning-members notification requires a non-empty member list".to_owned(),
            ));
        }

        let mut body = String::from(
            "The following members had lapsed and just registered again; \
             they were previously purged from the distribution groups:\n\n",
        );
        for member in members {
            body.push_str(&member_line(member));
        }
        self.send_or_log(&EmailMessage {
            subject: format!("[membersync] {} returning member(s)", members.len()),
            body,
        })
        .await
    }

    /// Sends the weekly newcomer digest. Always sends: an empty week
    /// produces a distinct "no newcomers" body rather than suppressing
    /// the send.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when delivery fails.
    pub async fn notify_weekly_digest(&self, newcomers: &[Member]) -> Result<(), SyncError> {
        let body = if newcomers.is_empty() {
            "No new members this week.\n".to_owned()
        } else {
            let mut body = String::from("New members this week:\n\n");
            for member in newcomers {
                body.push_str(&member_line(member));
            }
            body
        };
        self.send_or_log(&EmailMessage {
            subject: format!("[membersync] weekly digest: {} newcomer(s)", newcomers.len()),
            body,
        })
        .await
    }

    /// Reports current members whose team-chat account was deactivated.
    /// An empty list is a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::External`] when delivery fails.
    pub async fn notify_deactivated_chat_accounts(
        &self,
        emails: &[String],
    ) -> Result<(), SyncError> {
        if emails.is_empty() {
            return Ok(());
        }

        let mut body = String::from(
            "The following current members have a deactivated team-chat account:\n\n",
        );
        for email in emails {
            body.push_str(&format!("- {email}\n"));
        }
        self.send_or_log(&EmailMessage {
            subject: format!("[membersync] {} deactivated chat account(s)", emails.len()),
            body,
        })
        .await
    }

    async fn send_or_log(&self, message: &EmailMessage) -> Result<(), SyncError> {
        if self.debug {
            tracing::info!(subject = %message.subject, "debug mode: skipping email send");
            return Ok(());
        }
        tracing::info!(subject = %message.subject, "sending administrative email");
        self.mailer.send(message).await
    }
}

fn member_line(member: &Member) -> String {
    format!(
        "- {} {} <{}> (last registration: {})\n",
        member.first_name,
        member.last_name,
        member.primary_email,
        member.last_registration_date.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use membersync_core::error::SyncError;
    use membersync_core::member::Member;
    use membersync_test_support::RecordingMailer;
    use uuid::Uuid;

    use super::NotificationService;

    fn member(email: &str) -> Member {
        let date = Utc.with_ymd_and_hms(2019, 5, 1, 10, 0, 0).unwrap();
        Member {
            id: Uuid::new_v4(),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            primary_email: email.to_owned(),
            additional_emails: Vec::new(),
            postal_code: None,
            city: None,
            how_heard_about_us: None,
            volunteer_interest: None,
            first_registration_date: date,
            last_registration_date: date,
            is_professional: false,
            notification_sent: false,
        }
    }

    #[tokio::test]
    async fn test_returning_members_with_empty_list_is_a_precondition_error() {
        // Arrange
        let mailer = Arc::new(RecordingMailer::new());
        let service = NotificationService::new(mailer.clone(), false);

        // Act
        let result = service.notify_returning_members(&[]).await;

        // Assert
        assert!(matches!(result, Err(SyncError::Precondition(_))));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_returning_members_sends_one_email_listing_each_member() {
        // Arrange
        let mailer = Arc::new(RecordingMailer::new());
        let service = NotificationService::new(mailer.clone(), false);
        let members = [member("a@mail.com"), member("b@mail.com")];

        // Act
        service.notify_returning_members(&members).await.unwrap();

        // Assert
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("a@mail.com"));
        assert!(sent[0].body.contains("b@mail.com"));
    }

    #[tokio::test]
    async fn test_weekly_digest_sends_even_when_empty() {
        // Arrange
        let mailer = Arc::new(RecordingMailer::new());
        let service = NotificationService::new(mailer.clone(), false);

        // Act
        service.notify_weekly_digest(&[]).await.unwrap();

        // Assert
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("No new members this week"));
    }

    #[tokio::test]
    async fn test_deactivated_chat_accounts_empty_is_a_silent_no_op() {
        // Arrange
        let mailer = Arc::new(RecordingMailer::new());
        let service = NotificationService::new(mailer.clone(), false);

        // Act
        service.notify_deactivated_chat_accounts(&[]).await.unwrap();

        // Assert
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_debug_mode_skips_all_sends() {
        // Arrange
        let mailer = Arc::new(RecordingMailer::new());
        let service = NotificationService::new(mailer.clone(), true);

        // Act
        service
            .notify_returning_members(&[member("a@mail.com")])
            .await
            .unwrap();
        service.notify_weekly_digest(&[]).await.unwrap();
        service
            .notify_deactivated_chat_accounts(&["a@mail.com".to_owned()])
            .await
            .unwrap();

        // Assert
        assert!(mailer.sent().is_empty());
    }
}
