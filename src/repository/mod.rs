//! Record store and catalog collaborators
//!
//! The services only see the traits. The in-memory implementations are the
//! reference backends used by the server and the tests.

pub mod catalog;
pub mod loans;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{path::Path, sync::Arc};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Availability, Book},
        borrow::BorrowRecord,
    },
};

/// System of record for borrow records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records in stable (insertion) order
    async fn list(&self) -> AppResult<Vec<BorrowRecord>>;

    async fn get(&self, id: i32) -> AppResult<BorrowRecord>;

    /// Store a new record and assign its id
    async fn insert(&self, record: BorrowRecord) -> AppResult<BorrowRecord>;

    /// Compare-and-swap on `record.version`; `Stale` when the stored copy
    /// moved on since the snapshot was read.
    async fn save(&self, record: BorrowRecord) -> AppResult<BorrowRecord>;
}

/// Book catalog; source of the available count
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get(&self, book_id: i32) -> AppResult<Book>;

    async fn available_count(&self) -> AppResult<u64>;

    /// Check availability and mark the book borrowed in one step.
    /// `BusinessRule` when the book is already out.
    async fn reserve(&self, book_id: i32) -> AppResult<Book>;

    async fn set_availability(&self, book_id: i32, availability: Availability) -> AppResult<()>;
}

/// Collaborators shared by the services
#[derive(Clone)]
pub struct Repository {
    pub loans: Arc<dyn RecordStore>,
    pub catalog: Arc<dyn Catalog>,
}

#[derive(Debug, Deserialize, Default)]
struct Seed {
    #[serde(default)]
    books: Vec<Book>,
    #[serde(default)]
    records: Vec<BorrowRecord>,
}

impl Repository {
    pub fn new(loans: Arc<dyn RecordStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { loans, catalog }
    }

    /// Empty in-memory backends
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(loans::LoansRepository::new()),
            Arc::new(catalog::CatalogRepository::new()),
        )
    }

    /// In-memory backends populated from a JSON seed file
    pub fn from_seed_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let seed: Seed = serde_json::from_str(&raw).map_err(|e| {
            AppError::Internal(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            books = seed.books.len(),
            records = seed.records.len(),
            "Loaded seed data from {}",
            path.display()
        );

        Self::from_seed(seed)
    }

    fn from_seed(seed: Seed) -> AppResult<Self> {
        for record in &seed.records {
            check_seed_record(record)?;
        }

        Ok(Self::new(
            Arc::new(loans::LoansRepository::with_records(seed.records)),
            Arc::new(catalog::CatalogRepository::with_books(seed.books)),
        ))
    }
}

/// Records loaded from outside must already satisfy the borrow invariants
fn check_seed_record(record: &BorrowRecord) -> AppResult<()> {
    let invalid = |reason: &str| -> AppResult<()> {
        Err(AppError::Validation(format!(
            "Seed record {}: {}",
            record.id, reason
        )))
    };

    if record.due_date < record.borrow_date {
        return invalid("due date is before the borrow date");
    }
    if record.return_date.is_some_and(|returned| returned < record.borrow_date) {
        return invalid("return date is before the borrow date");
    }
    if record.fine_amount < Decimal::ZERO {
        return invalid("fine is negative");
    }
    if !record.is_returned() && !record.fine_amount.is_zero() {
        return invalid("open loan carries a fine");
    }
    if record.fine_paid && record.fine_amount.is_zero() {
        return invalid("fine marked as paid but none was charged");
    }
    Ok(())
}
