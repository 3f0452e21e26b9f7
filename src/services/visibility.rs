//! Role-scoped visibility of borrow records and the action predicates
//! every surface consults before offering a mutation.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        actor::{Actor, Role},
        borrow::{BorrowRecord, BorrowView},
    },
};

/// Records `actor` may see, projected for that actor.
///
/// Members get their own records only, stripped of borrower identity.
/// Staff get every record with borrower identity and contact fields.
pub fn filter(records: &[BorrowRecord], actor: &Actor) -> Vec<BorrowView> {
    records
        .iter()
        .filter_map(|record| view(record, actor))
        .collect()
}

/// Single-record form of [`filter`]
pub fn view(record: &BorrowRecord, actor: &Actor) -> Option<BorrowView> {
    if !can_view(record, actor) {
        return None;
    }

    let borrower = actor.role.is_staff().then(|| record.borrower.clone());

    Some(BorrowView {
        id: record.id,
        book: record.book.clone(),
        borrower,
        borrow_date: record.borrow_date,
        due_date: record.due_date,
        return_date: record.return_date,
        fine_amount: record.fine_amount,
        fine_paid: record.fine_paid,
    })
}

pub fn can_view(record: &BorrowRecord, actor: &Actor) -> bool {
    actor.role.is_staff() || is_borrower(record, actor)
}

pub fn is_borrower(record: &BorrowRecord, actor: &Actor) -> bool {
    record.borrower.id == actor.id
}

/// Only the borrowing member may return, and only while the book is out.
pub fn can_return(record: &BorrowRecord, actor: &Actor, now: DateTime<Utc>) -> bool {
    actor.role == Role::Member && is_borrower(record, actor) && record.status(now).is_open()
}

pub fn can_notify(actor: &Actor) -> bool {
    actor.role.is_staff()
}

pub fn can_manage_fines(actor: &Actor) -> bool {
    actor.role.is_staff()
}

pub fn can_send_reminders(actor: &Actor) -> bool {
    actor.role == Role::Admin
}

/// Ownership half of [`can_return`]. The status half is left to the
/// lifecycle so a double return reports `InvalidTransition`.
pub fn ensure_can_return(record: &BorrowRecord, actor: &Actor) -> AppResult<()> {
    if actor.role != Role::Member {
        return Err(AppError::Forbidden(
            "Only the borrowing member can return a book".to_string(),
        ));
    }
    if !is_borrower(record, actor) {
        return Err(AppError::Forbidden(format!(
            "Loan {} belongs to another borrower",
            record.id
        )));
    }
    Ok(())
}

pub fn ensure_can_notify(actor: &Actor) -> AppResult<()> {
    if can_notify(actor) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Librarian or administrator privileges required to contact borrowers".to_string(),
        ))
    }
}

pub fn ensure_can_manage_fines(actor: &Actor) -> AppResult<()> {
    if can_manage_fines(actor) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Librarian or administrator privileges required to manage fines".to_string(),
        ))
    }
}

pub fn ensure_can_send_reminders(actor: &Actor) -> AppResult<()> {
    if can_send_reminders(actor) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Administrator privileges required".to_string(),
        ))
    }
}
