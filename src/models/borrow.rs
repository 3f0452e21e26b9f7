//! Borrow record model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only snapshot of the borrowed book, taken when the loan is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRef {
    pub id: i32,
    pub title: String,
    pub author: String,
}

/// Borrower identity and contact fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerRef {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
}

/// One loan of one book to one borrower, as held by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub id: i32,
    pub book: BookRef,
    pub borrower: BorrowerRef,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fine_amount: Decimal,
    #[serde(default)]
    pub fine_paid: bool,
    /// Optimistic-concurrency token, bumped by the store on every save
    #[serde(default)]
    pub version: u64,
}

/// Status of a record at a given instant. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Active,
    Overdue,
    Returned,
}

impl BorrowStatus {
    /// Single source of truth for status derivation
    pub fn derive(
        return_date: Option<DateTime<Utc>>,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        match return_date {
            Some(_) => BorrowStatus::Returned,
            None if now > due_date => BorrowStatus::Overdue,
            None => BorrowStatus::Active,
        }
    }

    /// Active or overdue, i.e. the book is still out
    pub fn is_open(&self) -> bool {
        !matches!(self, BorrowStatus::Returned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Active => "active",
            BorrowStatus::Overdue => "overdue",
            BorrowStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl BorrowRecord {
    pub fn status(&self, now: DateTime<Utc>) -> BorrowStatus {
        BorrowStatus::derive(self.return_date, self.due_date, now)
    }

    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }

    /// True when a fine was charged at return and staff have not settled it
    pub fn has_unpaid_fine(&self) -> bool {
        self.is_returned() && self.fine_amount > Decimal::ZERO && !self.fine_paid
    }
}

/// A record as exposed to one actor.
///
/// `borrower` is only populated for staff; members never receive borrower
/// identity, not even their own echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowView {
    pub id: i32,
    pub book: BookRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower: Option<BorrowerRef>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub fine_amount: Decimal,
    pub fine_paid: bool,
}

impl BorrowView {
    pub fn status(&self, now: DateTime<Utc>) -> BorrowStatus {
        BorrowStatus::derive(self.return_date, self.due_date, now)
    }
}

/// Parameters for opening a new loan
#[derive(Debug, Clone)]
pub struct NewBorrow {
    pub book: BookRef,
    pub borrower: BorrowerRef,
    pub due_date: DateTime<Utc>,
}
