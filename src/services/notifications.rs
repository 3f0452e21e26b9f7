//! Borrower notifications
//!
//! Sending mail never touches the borrow record: a failed delivery is
//! reported to the caller and nothing is rolled back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{actor::Actor, borrow::BorrowRecord, borrow::BorrowStatus},
};

use super::visibility;

/// Outbound mail collaborator. Implementations report failures as
/// `AppError::DeliveryFailed` and do not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;
}

/// Outcome of a reminder batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub sent: usize,
    /// Loans whose borrower could not be reached
    pub failed: Vec<i32>,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn MailSender>,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn MailSender>) -> Self {
        Self { mailer }
    }

    /// Send a free-form message to the borrower of `record`
    pub async fn notify(
        &self,
        record: &BorrowRecord,
        actor: &Actor,
        subject: &str,
        body: &str,
    ) -> AppResult<()> {
        visibility::ensure_can_notify(actor)?;

        if subject.trim().is_empty() || body.trim().is_empty() {
            return Err(AppError::Validation(
                "Subject and message are required".to_string(),
            ));
        }

        let to = borrower_address(record)?;
        self.mailer.send(to, subject, body).await?;

        tracing::info!(
            loan_id = record.id,
            actor_id = actor.id,
            "Sent message to borrower {}",
            record.borrower.username
        );
        Ok(())
    }

    /// Remind the borrower of every overdue record in `records`.
    ///
    /// A failed delivery is recorded and the batch carries on.
    pub async fn send_due_reminders(
        &self,
        records: &[BorrowRecord],
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> AppResult<ReminderReport> {
        visibility::ensure_can_send_reminders(actor)?;

        let mut report = ReminderReport::default();

        for record in records
            .iter()
            .filter(|r| r.status(now) == BorrowStatus::Overdue)
        {
            let (subject, body) = due_reminder(record);
            let outcome = match borrower_address(record) {
                Ok(to) => self.mailer.send(to, &subject, &body).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    tracing::warn!(loan_id = record.id, "Reminder not delivered: {}", e);
                    report.failed.push(record.id);
                }
            }
        }

        tracing::info!(
            sent = report.sent,
            failed = report.failed.len(),
            "Sent {} notifications for overdue books",
            report.sent
        );
        Ok(report)
    }
}

fn borrower_address(record: &BorrowRecord) -> AppResult<&str> {
    record
        .borrower
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Borrower {} has no email address",
                record.borrower.username
            ))
        })
}

fn due_reminder(record: &BorrowRecord) -> (String, String) {
    let subject = format!("Overdue: {}", record.book.title);
    let body = format!(
        r#"
Hello {username},

"{title}" by {author} was due back on {due}.

Please return it as soon as possible. A fine accrues for every started day past the due date.
"#,
        username = record.borrower.username,
        title = record.book.title,
        author = record.book.author,
        due = record.due_date.format("%Y-%m-%d"),
    );
    (subject, body)
}
