//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    services::{
        loans::LoanListing,
        notifications::ReminderReport,
        pagination::Page,
        visibility,
    },
    AppState,
};

use super::AuthenticatedActor;

/// Paging parameters
#[derive(Debug, Deserialize)]
pub struct LoanQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// One page of loans plus the list-level actions open to the caller
#[derive(Serialize)]
pub struct LoansPageResponse {
    #[serde(flatten)]
    pub page: Page<LoanListing>,
    pub can_notify: bool,
    pub can_manage_fines: bool,
}

/// Borrow request
#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub book_id: i32,
    /// Due date (ISO 8601)
    pub due_date: DateTime<Utc>,
}

/// Loan returned with a status message
#[derive(Serialize)]
pub struct LoanMessageResponse {
    pub message: String,
    pub loan: LoanListing,
}

/// Message to a borrower
#[derive(Debug, Deserialize, Validate)]
pub struct SendEmailRequest {
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ReminderResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: ReminderReport,
}

/// List loans visible to the caller
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<LoansPageResponse>> {
    let page = state
        .services
        .loans
        .list(&actor, query.page, query.per_page)
        .await?;

    Ok(Json(LoansPageResponse {
        page,
        can_notify: visibility::can_notify(&actor),
        can_manage_fines: visibility::can_manage_fines(&actor),
    }))
}

/// Get one loan
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanListing>> {
    let loan = state.services.loans.get(&actor, loan_id).await?;
    Ok(Json(loan))
}

/// Borrow a book
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanMessageResponse>)> {
    let loan = state
        .services
        .loans
        .borrow(&actor, request.book_id, request.due_date)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanMessageResponse {
            message: "Book borrowed successfully".to_string(),
            loan,
        }),
    ))
}

/// Return a borrowed book
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanMessageResponse>> {
    let loan = state.services.loans.return_loan(&actor, loan_id).await?;

    let message = if loan.loan.fine_amount > Decimal::ZERO {
        format!("Book returned successfully with a fine of {}", loan.loan.fine_amount)
    } else {
        "Book returned successfully".to_string()
    };

    Ok(Json(LoanMessageResponse { message, loan }))
}

/// Email the borrower of a loan
pub async fn send_email(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<i32>,
    Json(request): Json<SendEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .services
        .loans
        .send_email(&actor, loan_id, &request.subject, &request.message)
        .await?;

    Ok(Json(MessageResponse {
        message: "Email sent successfully.".to_string(),
    }))
}

/// Send reminders for every overdue loan
pub async fn send_due_reminders(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> AppResult<Json<ReminderResponse>> {
    let report = state.services.loans.send_due_reminders(&actor).await?;

    Ok(Json(ReminderResponse {
        message: format!("Sent {} notifications for overdue books", report.sent),
        report,
    }))
}

/// Returned loans with an outstanding fine
pub async fn unpaid_fines(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> AppResult<Json<Vec<LoanListing>>> {
    let loans = state.services.loans.unpaid_fines(&actor).await?;
    Ok(Json(loans))
}

/// Mark the fine on a loan as paid
pub async fn mark_fine_paid(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanMessageResponse>> {
    let loan = state.services.loans.mark_fine_paid(&actor, loan_id).await?;

    Ok(Json(LoanMessageResponse {
        message: format!(
            "Fine of {} for {} marked as paid",
            loan.loan.fine_amount, loan.loan.book.title
        ),
        loan,
    }))
}
