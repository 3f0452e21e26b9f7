//! Fine policy: per-day-late rate, started days rounded up, no cap

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    config::FinesConfig,
    error::{AppError, AppResult},
    models::borrow::BorrowRecord,
};

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq)]
pub struct FinePolicy {
    daily_rate: Decimal,
    currency_scale: u32,
}

impl FinePolicy {
    pub fn new(daily_rate: Decimal, currency_scale: u32) -> AppResult<Self> {
        if daily_rate < Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Fine daily rate must not be negative (got {})",
                daily_rate
            )));
        }
        Ok(Self {
            daily_rate,
            currency_scale,
        })
    }

    pub fn from_config(config: &FinesConfig) -> AppResult<Self> {
        Self::new(config.daily_rate, config.currency_scale)
    }

    pub fn daily_rate(&self) -> Decimal {
        self.daily_rate
    }

    /// Fine owed for having been `overdue` past the due date.
    pub fn compute_fine(&self, overdue: Duration) -> Decimal {
        let days = overdue_days(overdue);
        (self.daily_rate * Decimal::from(days))
            .round_dp_with_strategy(self.currency_scale, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Fine the record would carry if it were returned at `now`.
    /// Returned records report the fine charged at return.
    pub fn projected_fine(&self, record: &BorrowRecord, now: DateTime<Utc>) -> Decimal {
        if record.is_returned() {
            return record.fine_amount;
        }
        self.compute_fine(now - record.due_date)
    }
}

/// Started days in `overdue`; a single late millisecond counts as a day.
pub fn overdue_days(overdue: Duration) -> i64 {
    let millis = overdue.num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}
