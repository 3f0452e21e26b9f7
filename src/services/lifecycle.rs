//! Borrow lifecycle: `Active -> Overdue -> Returned`, with `Returned` terminal.
//!
//! Every function takes a snapshot and hands back a new one. Nothing here
//! touches the store; callers persist the result and drop the old copy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::borrow::{BorrowRecord, BorrowStatus, NewBorrow},
};

use super::fines::FinePolicy;

/// Status of `record` at `now`. Call at read time; never cache the result.
pub fn derive_status(record: &BorrowRecord, now: DateTime<Utc>) -> BorrowStatus {
    record.status(now)
}

/// Open a new loan starting at `now`. The store assigns the id on insert.
pub fn open(new: NewBorrow, now: DateTime<Utc>) -> AppResult<BorrowRecord> {
    if new.due_date < now {
        return Err(AppError::Validation(format!(
            "Due date {} is before the borrow date {}",
            new.due_date.to_rfc3339(),
            now.to_rfc3339()
        )));
    }

    Ok(BorrowRecord {
        id: 0,
        book: new.book,
        borrower: new.borrower,
        borrow_date: now,
        due_date: new.due_date,
        return_date: None,
        fine_amount: Decimal::ZERO,
        fine_paid: false,
        version: 0,
    })
}

/// Return the book at `now`, charging a fine when past due.
pub fn return_record(
    record: &BorrowRecord,
    now: DateTime<Utc>,
    policy: &FinePolicy,
) -> AppResult<BorrowRecord> {
    if record.is_returned() {
        return Err(AppError::InvalidTransition(format!(
            "Book already returned (loan {})",
            record.id
        )));
    }
    if now < record.borrow_date {
        return Err(AppError::Validation(format!(
            "Return date {} is before the borrow date {}",
            now.to_rfc3339(),
            record.borrow_date.to_rfc3339()
        )));
    }

    let fine_amount = if now > record.due_date {
        policy.compute_fine(now - record.due_date)
    } else {
        Decimal::ZERO
    };

    Ok(BorrowRecord {
        return_date: Some(now),
        fine_amount,
        ..record.clone()
    })
}

/// Settle the fine charged at return.
pub fn mark_fine_paid(record: &BorrowRecord) -> AppResult<BorrowRecord> {
    if !record.is_returned() {
        return Err(AppError::InvalidTransition(format!(
            "Loan {} has not been returned yet",
            record.id
        )));
    }
    if record.fine_amount <= Decimal::ZERO {
        return Err(AppError::InvalidTransition(format!(
            "Loan {} carries no fine",
            record.id
        )));
    }
    if record.fine_paid {
        return Err(AppError::InvalidTransition(format!(
            "Fine for loan {} already marked as paid",
            record.id
        )));
    }

    Ok(BorrowRecord {
        fine_paid: true,
        ..record.clone()
    })
}
