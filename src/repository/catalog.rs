//! In-memory book catalog

use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::book::{Availability, Book},
};

use super::Catalog;

#[derive(Clone, Default)]
pub struct CatalogRepository {
    books: Arc<RwLock<BTreeMap<i32, Book>>>,
}

impl CatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(books: Vec<Book>) -> Self {
        Self {
            books: Arc::new(RwLock::new(books.into_iter().map(|b| (b.id, b)).collect())),
        }
    }
}

#[async_trait]
impl Catalog for CatalogRepository {
    async fn get(&self, book_id: i32) -> AppResult<Book> {
        self.books
            .read()
            .await
            .get(&book_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn available_count(&self) -> AppResult<u64> {
        let books = self.books.read().await;
        Ok(books.values().filter(|b| b.is_available()).count() as u64)
    }

    async fn reserve(&self, book_id: i32) -> AppResult<Book> {
        let mut books = self.books.write().await;
        let book = books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        if !book.is_available() {
            return Err(AppError::BusinessRule(
                "This book is not available for borrowing".to_string(),
            ));
        }
        book.availability = Availability::Borrowed;
        Ok(book.clone())
    }

    async fn set_availability(&self, book_id: i32, availability: Availability) -> AppResult<()> {
        let mut books = self.books.write().await;
        let book = books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        book.availability = availability;
        Ok(())
    }
}
