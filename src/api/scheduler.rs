//! Scheduler driver endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, services::scheduler::TickSummary};

/// Run one driver tick now
#[utoipa::path(
    post,
    path = "/scheduler/tick",
    tag = "scheduler",
    responses(
        (status = 200, description = "Tick summary", body = TickSummary)
    )
)]
pub async fn run_tick(State(state): State<crate::AppState>) -> AppResult<Json<TickSummary>> {
    let summary = state.services.scheduler.tick().await?;
    Ok(Json(summary))
}
