//! Data models for Lending Desk

pub mod actor;
pub mod book;
pub mod borrow;

// Re-export commonly used types
pub use actor::{Actor, ActorClaims, Role};
pub use book::{Availability, Book};
pub use borrow::{BookRef, BorrowRecord, BorrowStatus, BorrowView, BorrowerRef, NewBorrow};
