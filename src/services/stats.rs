//! Dashboard counters

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        actor::{Actor, Role},
        borrow::{BorrowRecord, BorrowStatus},
    },
    repository::Repository,
};

use super::{clock::Clock, visibility};

/// Counters shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Visible records still out (active or overdue)
    pub borrowed_count: u64,
    /// Visible records past their due date
    pub overdue_count: u64,
    /// Catalog figure, passed through
    pub available_count: u64,
}

/// Dashboard counters plus the scope they were computed for
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub role: Role,
    /// `all` for staff, `own` for members
    pub scope: &'static str,
    #[serde(flatten)]
    pub stats: DashboardStats,
}

/// Compute the counters over what `actor` can see at `now`.
///
/// Always recomputed from the snapshot; identical inputs give identical
/// counts.
pub fn aggregate(
    records: &[BorrowRecord],
    actor: &Actor,
    now: DateTime<Utc>,
    available_count: u64,
) -> DashboardStats {
    let visible = visibility::filter(records, actor);

    let (borrowed_count, overdue_count) =
        visible
            .iter()
            .fold((0u64, 0u64), |(borrowed, overdue), view| match view.status(now) {
                BorrowStatus::Active => (borrowed + 1, overdue),
                BorrowStatus::Overdue => (borrowed + 1, overdue + 1),
                BorrowStatus::Returned => (borrowed, overdue),
            });

    DashboardStats {
        borrowed_count,
        overdue_count,
        available_count,
    }
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Dashboard for `actor` from a fresh store snapshot
    pub async fn dashboard(&self, actor: &Actor) -> AppResult<DashboardResponse> {
        let records = self.repository.loans.list().await?;
        let available = self.repository.catalog.available_count().await?;
        let now = self.clock.now();

        Ok(DashboardResponse {
            role: actor.role,
            scope: if actor.role.is_staff() { "all" } else { "own" },
            stats: aggregate(&records, actor, now, available),
        })
    }
}
