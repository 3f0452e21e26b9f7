//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, services::stats::DashboardResponse, AppState};

use super::AuthenticatedActor;

/// Dashboard counters scoped to the caller
pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> AppResult<Json<DashboardResponse>> {
    let dashboard = state.services.stats.dashboard(&actor).await?;
    Ok(Json(dashboard))
}
