//! Business logic services

pub mod clock;
pub mod email;
pub mod fines;
pub mod lifecycle;
pub mod loans;
pub mod notifications;
pub mod pagination;
pub mod stats;
pub mod visibility;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services over the given collaborators
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        mailer: Arc<dyn notifications::MailSender>,
        clock: Arc<dyn clock::Clock>,
    ) -> AppResult<Self> {
        let fines = fines::FinePolicy::from_config(&config.fines)?;
        let notifications = notifications::NotificationDispatcher::new(mailer);

        Ok(Self {
            loans: loans::LoansService::new(
                repository.clone(),
                clock.clone(),
                fines,
                notifications,
                config.pagination.per_page,
            ),
            stats: stats::StatsService::new(repository, clock),
        })
    }
}
