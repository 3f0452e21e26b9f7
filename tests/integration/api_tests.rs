//! API integration tests

use axum::http::StatusCode;
use serde_json::json;

use lending_desk::models::{actor::Role, book::Availability};

use crate::common::*;

fn standard_app() -> TestApp {
    spawn_app(
        vec![
            book(1, Availability::Borrowed),
            book(2, Availability::Borrowed),
            book(3, Availability::Available),
        ],
        vec![
            loan(1, MEMBER_ID, day(7)),
            loan(2, OTHER_MEMBER_ID, day(3)),
        ],
        false,
    )
}

#[tokio::test]
async fn test_health_check() {
    let app = standard_app();
    let (status, body) = app.call("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = standard_app();

    let (status, _) = app.call("GET", "/loans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call("GET", "/loans", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_lists_only_own_loans_without_identity() {
    let app = standard_app();
    let token = token(MEMBER_ID, Role::Member);

    let (status, body) = app.call("GET", "/loans", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], 1);
    assert!(body["items"][0].get("borrower").is_none());
    assert_eq!(body["can_notify"], false);
    assert!(!body.to_string().contains("user4"));
}

#[tokio::test]
async fn test_librarian_lists_all_loans_with_borrowers() {
    let app = standard_app();
    let token = token(LIBRARIAN_ID, Role::Librarian);

    let (status, body) = app.call("GET", "/loans", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][1]["borrower"]["username"], "user4");
    assert_eq!(body["items"][1]["borrower"]["email"], "user4@example.org");
    assert_eq!(body["can_notify"], true);
    assert_eq!(body["items"][0]["can_return"], false);
}

#[tokio::test]
async fn test_borrow_and_late_return_flow() {
    let app = standard_app();
    let token = token(MEMBER_ID, Role::Member);

    let (status, body) = app
        .call(
            "POST",
            "/loans",
            Some(&token),
            Some(json!({ "book_id": 3, "due_date": day(8) })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["loan"]["status"], "active");
    let loan_id = body["loan"]["id"].as_i64().expect("No loan id");

    // Book 3 is no longer available to anyone else
    let other = token_for_other_member();
    let (status, _) = app
        .call(
            "POST",
            "/loans",
            Some(&other),
            Some(json!({ "book_id": 3, "due_date": day(8) })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Two days and a bit late: three started days at 5 per day
    app.clock.set(day(10) + chrono::Duration::hours(1));
    let (status, body) = app
        .call("POST", &format!("/loans/{}/return", loan_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan"]["status"], "returned");
    assert_eq!(body["loan"]["fine_amount"], "15");
    assert_eq!(body["message"], "Book returned successfully with a fine of 15");

    let (status, body) = app
        .call("POST", &format!("/loans/{}/return", loan_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidTransition");
}

fn token_for_other_member() -> String {
    token(OTHER_MEMBER_ID, Role::Member)
}

#[tokio::test]
async fn test_member_cannot_return_someone_elses_loan() {
    let app = standard_app();
    let token = token(MEMBER_ID, Role::Member);

    let (status, _) = app.call("POST", "/loans/2/return", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call("GET", "/loans/2", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_loan_is_not_found() {
    let app = standard_app();
    let token = token(ADMIN_ID, Role::Admin);

    let (status, body) = app.call("GET", "/loans/404", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Record no longer exists"));
}

#[tokio::test]
async fn test_librarian_can_send_email() {
    let app = standard_app();
    let token = token(LIBRARIAN_ID, Role::Librarian);

    let (status, body) = app
        .call(
            "POST",
            "/loans/1/email",
            Some(&token),
            Some(json!({ "subject": "Reminder", "message": "Return the book soon." })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email sent successfully.");

    let sent = app.mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "user3@example.org");
    assert_eq!(sent[0].subject, "Reminder");
}

#[tokio::test]
async fn test_member_cannot_send_email() {
    let app = standard_app();
    let token = token(MEMBER_ID, Role::Member);

    let (status, _) = app
        .call(
            "POST",
            "/loans/1/email",
            Some(&token),
            Some(json!({ "subject": "Hi", "message": "Body" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_email_requires_subject_and_message() {
    let app = standard_app();
    let token = token(LIBRARIAN_ID, Role::Librarian);

    let (status, _) = app
        .call(
            "POST",
            "/loans/1/email",
            Some(&token),
            Some(json!({ "subject": "", "message": "Body" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delivery_failure_does_not_change_loan() {
    let app = spawn_app(
        vec![book(1, Availability::Borrowed)],
        vec![loan(1, MEMBER_ID, day(7))],
        true,
    );
    let librarian = token(LIBRARIAN_ID, Role::Librarian);

    let (_, before) = app.call("GET", "/loans/1", Some(&librarian), None).await;
    let (status, body) = app
        .call(
            "POST",
            "/loans/1/email",
            Some(&librarian),
            Some(json!({ "subject": "Hi", "message": "Body" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "DeliveryFailure");

    let (_, after) = app.call("GET", "/loans/1", Some(&librarian), None).await;
    assert_eq!(before, after);

    let member = token(MEMBER_ID, Role::Member);
    let (status, _) = app.call("POST", "/loans/1/return", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_dashboard_is_scoped_by_role() {
    let app = standard_app();
    app.clock.set(day(5));

    let (status, body) = app
        .call("GET", "/stats/dashboard", Some(&token(ADMIN_ID, Role::Admin)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scope"], "all");
    assert_eq!(body["borrowed_count"], 2);
    assert_eq!(body["overdue_count"], 1);
    assert_eq!(body["available_count"], 1);

    let (_, body) = app
        .call("GET", "/stats/dashboard", Some(&token(MEMBER_ID, Role::Member)), None)
        .await;
    assert_eq!(body["scope"], "own");
    assert_eq!(body["borrowed_count"], 1);
    assert_eq!(body["overdue_count"], 0);
}

#[tokio::test]
async fn test_pagination_clamps_out_of_range_page() {
    let records = (1..=17).map(|id| loan(id, MEMBER_ID, day(7))).collect();
    let books = (1..=17).map(|id| book(id, Availability::Borrowed)).collect();
    let app = spawn_app(books, records, false);
    let token = token(LIBRARIAN_ID, Role::Librarian);

    let (_, first) = app
        .call("GET", "/loans?page=1&per_page=8", Some(&token), None)
        .await;
    assert_eq!(first["total_pages"], 3);
    assert_eq!(first["items"].as_array().map(Vec::len), Some(8));

    let (_, clamped) = app
        .call("GET", "/loans?page=5&per_page=8", Some(&token), None)
        .await;
    assert_eq!(clamped["page"], 3);
    assert_eq!(clamped["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(clamped["items"][0]["id"], 17);
}

#[tokio::test]
async fn test_reminders_and_fine_ledger() {
    let app = standard_app();
    app.clock.set(day(9));

    // Only admins send bulk reminders
    let (status, _) = app
        .call("POST", "/reminders", Some(&token(LIBRARIAN_ID, Role::Librarian)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call("POST", "/reminders", Some(&token(ADMIN_ID, Role::Admin)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], 2);
    assert_eq!(app.mailer.sent.lock().unwrap().len(), 2);

    // Loan 2 was due on day 3: six days late
    let other = token_for_other_member();
    let (status, _) = app.call("POST", "/loans/2/return", Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);

    let librarian = token(LIBRARIAN_ID, Role::Librarian);
    let (status, body) = app.call("GET", "/fines/unpaid", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["fine_amount"], "30");

    let (status, _) = app.call("GET", "/fines/unpaid", Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call("POST", "/loans/2/fine-paid", Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan"]["fine_paid"], true);

    let (status, body) = app
        .call("POST", "/loans/2/fine-paid", Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidTransition");
    assert_eq!(body["code"], 30);
}
