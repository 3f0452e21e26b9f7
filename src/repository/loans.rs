//! In-memory borrow record store

use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::borrow::BorrowRecord,
};

use super::RecordStore;

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<i32, BorrowRecord>,
    next_id: i32,
}

#[derive(Clone, Default)]
pub struct LoansRepository {
    state: Arc<RwLock<State>>,
}

impl LoansRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload records, keeping their ids
    pub fn with_records(records: Vec<BorrowRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        let records = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            state: Arc::new(RwLock::new(State { records, next_id })),
        }
    }
}

#[async_trait]
impl RecordStore for LoansRepository {
    async fn list(&self) -> AppResult<Vec<BorrowRecord>> {
        let state = self.state.read().await;
        Ok(state.records.values().cloned().collect())
    }

    async fn get(&self, id: i32) -> AppResult<BorrowRecord> {
        let state = self.state.read().await;
        state
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn insert(&self, mut record: BorrowRecord) -> AppResult<BorrowRecord> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        record.id = state.next_id;
        record.version = 0;
        state.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn save(&self, mut record: BorrowRecord) -> AppResult<BorrowRecord> {
        let mut state = self.state.write().await;
        let stored = state
            .records
            .get_mut(&record.id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", record.id)))?;

        if stored.version != record.version {
            return Err(AppError::Stale(format!(
                "Loan {} was modified concurrently (version {} != {})",
                record.id, record.version, stored.version
            )));
        }

        record.version += 1;
        *stored = record.clone();
        Ok(record)
    }
}
