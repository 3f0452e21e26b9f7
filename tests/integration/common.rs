//! Shared fixtures: in-memory app state, fixed clock, recording mailer

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use lending_desk::{
    api,
    config::AppConfig,
    models::{
        actor::{ActorClaims, Role},
        book::{Availability, Book},
        borrow::{BookRef, BorrowRecord, BorrowerRef},
    },
    repository::{catalog::CatalogRepository, loans::LoansRepository, Repository},
    services::{clock::FixedClock, notifications::MailSender, Services},
    AppError, AppResult, AppState,
};

pub const SECRET: &str = "integration-secret";

pub const ADMIN_ID: i32 = 1;
pub const LIBRARIAN_ID: i32 = 2;
pub const MEMBER_ID: i32 = 3;
pub const OTHER_MEMBER_ID: i32 = 4;

pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap() + Duration::days(n)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail sender that records messages, or fails every delivery
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail: bool,
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        if self.fail {
            return Err(AppError::DeliveryFailed("SMTP server unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<FixedClock>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn book(id: i32, availability: Availability) -> Book {
    Book {
        id,
        title: format!("Book {}", id),
        author: "Anon".to_string(),
        availability,
    }
}

/// An open loan of book `id` to `borrower_id`, borrowed on day 0
pub fn loan(id: i32, borrower_id: i32, due: DateTime<Utc>) -> BorrowRecord {
    BorrowRecord {
        id,
        book: BookRef {
            id,
            title: format!("Book {}", id),
            author: "Anon".to_string(),
        },
        borrower: BorrowerRef {
            id: borrower_id,
            username: format!("user{}", borrower_id),
            email: Some(format!("user{}@example.org", borrower_id)),
        },
        borrow_date: day(0),
        due_date: due,
        return_date: None,
        fine_amount: Decimal::ZERO,
        fine_paid: false,
        version: 0,
    }
}

pub fn spawn_app(books: Vec<Book>, records: Vec<BorrowRecord>, failing_mailer: bool) -> TestApp {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config.fines.daily_rate = Decimal::from(5);

    let clock = Arc::new(FixedClock::new(day(1)));
    let mailer = Arc::new(RecordingMailer {
        fail: failing_mailer,
        ..Default::default()
    });

    let repository = Repository::new(
        Arc::new(LoansRepository::with_records(records)),
        Arc::new(CatalogRepository::with_books(books)),
    );
    let services = Services::new(repository, &config, mailer.clone(), clock.clone())
        .expect("Failed to build services");

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    TestApp {
        router: api::router(state),
        clock,
        mailer,
    }
}

pub fn token(user_id: i32, role: Role) -> String {
    let now = Utc::now().timestamp();
    ActorClaims {
        sub: format!("user{}", user_id),
        user_id,
        email: Some(format!("user{}@example.org", user_id)),
        role,
        exp: now + 3600,
        iat: now,
    }
    .create_token(SECRET)
    .expect("Failed to create token")
}

impl TestApp {
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri));
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}
