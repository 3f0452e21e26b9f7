//! Loan management service
//!
//! Fetch, decide, transition, save. The store's answer is the only truth
//! after a mutation; a `Stale` save is handed back to the caller untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        actor::Actor,
        book::Availability,
        borrow::{BorrowRecord, BorrowStatus, BorrowView, NewBorrow},
    },
    repository::Repository,
};

use super::{
    clock::Clock,
    fines::FinePolicy,
    lifecycle,
    notifications::{NotificationDispatcher, ReminderReport},
    pagination::{self, Page},
    visibility,
};

/// A visible record with its read-time status and the actions open to the
/// requesting actor
#[derive(Debug, Clone, Serialize)]
pub struct LoanListing {
    #[serde(flatten)]
    pub loan: BorrowView,
    pub status: BorrowStatus,
    /// Stored fine once returned, otherwise what returning now would cost
    pub accrued_fine: Decimal,
    pub can_return: bool,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    fines: FinePolicy,
    notifications: NotificationDispatcher,
    per_page: usize,
}

impl LoansService {
    pub fn new(
        repository: Repository,
        clock: Arc<dyn Clock>,
        fines: FinePolicy,
        notifications: NotificationDispatcher,
        per_page: usize,
    ) -> Self {
        Self {
            repository,
            clock,
            fines,
            notifications,
            per_page,
        }
    }

    fn listing(
        &self,
        record: &BorrowRecord,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Option<LoanListing> {
        let loan = visibility::view(record, actor)?;
        Some(LoanListing {
            status: loan.status(now),
            accrued_fine: self.fines.projected_fine(record, now),
            can_return: visibility::can_return(record, actor, now),
            loan,
        })
    }

    fn own_listing(
        &self,
        record: &BorrowRecord,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> AppResult<LoanListing> {
        self.listing(record, actor, now).ok_or_else(|| {
            AppError::Internal(format!("Loan {} not visible to its own actor", record.id))
        })
    }

    /// Records visible to `actor`, one page at a time
    pub async fn list(
        &self,
        actor: &Actor,
        page: Option<usize>,
        per_page: Option<usize>,
    ) -> AppResult<Page<LoanListing>> {
        let records = self.repository.loans.list().await?;
        let now = self.clock.now();

        let listings: Vec<LoanListing> = records
            .iter()
            .filter_map(|record| self.listing(record, actor, now))
            .collect();

        Ok(pagination::paginate(
            &listings,
            per_page.unwrap_or(self.per_page),
            page.unwrap_or(1),
        ))
    }

    /// A single record; invisible records are reported as not found
    pub async fn get(&self, actor: &Actor, loan_id: i32) -> AppResult<LoanListing> {
        let record = self.repository.loans.get(loan_id).await?;
        self.listing(&record, actor, self.clock.now())
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Borrow an available book for `actor`
    pub async fn borrow(
        &self,
        actor: &Actor,
        book_id: i32,
        due_date: DateTime<Utc>,
    ) -> AppResult<LoanListing> {
        let book = self.repository.catalog.reserve(book_id).await?;

        let now = self.clock.now();
        let opened = match lifecycle::open(
            NewBorrow {
                book: book.snapshot(),
                borrower: actor.as_borrower(),
                due_date,
            },
            now,
        ) {
            Ok(record) => self.repository.loans.insert(record).await,
            Err(e) => Err(e),
        };

        let record = match opened {
            Ok(record) => record,
            Err(e) => {
                self.release(book_id).await;
                return Err(e);
            }
        };

        tracing::info!(
            loan_id = record.id,
            book_id,
            borrower_id = actor.id,
            "Book borrowed, due {}",
            record.due_date.to_rfc3339()
        );

        self.own_listing(&record, actor, now)
    }

    /// Undo a reservation whose loan was never stored
    async fn release(&self, book_id: i32) {
        if let Err(e) = self
            .repository
            .catalog
            .set_availability(book_id, Availability::Available)
            .await
        {
            tracing::warn!(book_id, "Failed to release book reservation: {}", e);
        }
    }

    /// Return a borrowed book, charging a fine when it is late
    pub async fn return_loan(&self, actor: &Actor, loan_id: i32) -> AppResult<LoanListing> {
        let record = self.repository.loans.get(loan_id).await?;
        visibility::ensure_can_return(&record, actor)?;

        let now = self.clock.now();
        let returned = lifecycle::return_record(&record, now, &self.fines)?;
        let saved = self.repository.loans.save(returned).await?;

        // The return stands even if the catalog cannot be updated
        if let Err(e) = self
            .repository
            .catalog
            .set_availability(saved.book.id, Availability::Available)
            .await
        {
            tracing::warn!(
                loan_id = saved.id,
                book_id = saved.book.id,
                "Failed to mark book available after return: {}",
                e
            );
        }

        tracing::info!(
            loan_id = saved.id,
            borrower_id = actor.id,
            fine = %saved.fine_amount,
            "Book returned"
        );

        self.own_listing(&saved, actor, now)
    }

    /// Email the borrower of a loan
    pub async fn send_email(
        &self,
        actor: &Actor,
        loan_id: i32,
        subject: &str,
        body: &str,
    ) -> AppResult<()> {
        let record = self.repository.loans.get(loan_id).await?;
        self.notifications.notify(&record, actor, subject, body).await
    }

    /// Remind every borrower whose loan is overdue
    pub async fn send_due_reminders(&self, actor: &Actor) -> AppResult<ReminderReport> {
        visibility::ensure_can_send_reminders(actor)?;
        let records = self.repository.loans.list().await?;
        self.notifications
            .send_due_reminders(&records, actor, self.clock.now())
            .await
    }

    /// Returned loans whose fine is still outstanding
    pub async fn unpaid_fines(&self, actor: &Actor) -> AppResult<Vec<LoanListing>> {
        visibility::ensure_can_manage_fines(actor)?;
        let records = self.repository.loans.list().await?;
        let now = self.clock.now();

        Ok(records
            .iter()
            .filter(|record| record.has_unpaid_fine())
            .filter_map(|record| self.listing(record, actor, now))
            .collect())
    }

    /// Record that the fine on a returned loan was paid
    pub async fn mark_fine_paid(&self, actor: &Actor, loan_id: i32) -> AppResult<LoanListing> {
        visibility::ensure_can_manage_fines(actor)?;
        let record = self.repository.loans.get(loan_id).await?;

        let paid = lifecycle::mark_fine_paid(&record)?;
        let saved = self.repository.loans.save(paid).await?;

        tracing::info!(
            loan_id = saved.id,
            actor_id = actor.id,
            fine = %saved.fine_amount,
            "Fine marked as paid"
        );

        self.own_listing(&saved, actor, self.clock.now())
    }
}
