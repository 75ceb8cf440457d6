//! Maintenance job endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    models::maintenance::{
        CompleteJob, CreateMaintenanceType, JobState, MaintenanceJob, MaintenanceType,
    },
    repository::JobFilter,
};

/// Job list query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct JobsQuery {
    pub equipment_id: Option<i32>,
    pub state: Option<JobState>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

/// Completion response: the completed job and the automatically
/// scheduled successor
#[derive(Serialize, ToSchema)]
pub struct CompleteResponse {
    pub job: MaintenanceJob,
    pub successor: Option<MaintenanceJob>,
}

/// Uncomplete response; carries a warning when the auto-created
/// successor is still active
#[derive(Serialize, ToSchema)]
pub struct UncompleteResponse {
    pub job: MaintenanceJob,
    pub stale_successor: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Due-date correction request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RescheduleRequest {
    pub due_date: NaiveDate,
}

/// List maintenance jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    params(JobsQuery),
    responses(
        (status = 200, description = "Matching jobs", body = Vec<MaintenanceJob>)
    )
)]
pub async fn list_jobs(
    State(state): State<crate::AppState>,
    Query(query): Query<JobsQuery>,
) -> AppResult<Json<Vec<MaintenanceJob>>> {
    let filter = JobFilter {
        equipment_id: query.equipment_id,
        state: query.state,
        due_from: query.due_from,
        due_to: query.due_to,
    };
    let jobs = state.services.maintenance.list_jobs(&filter).await?;
    Ok(Json(jobs))
}

/// Get one maintenance job
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job", body = MaintenanceJob),
        (status = 404, description = "Job not found")
    )
)]
pub async fn get_job(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenanceJob>> {
    let job = state.services.maintenance.get_job(id).await?;
    Ok(Json(job))
}

/// Start work on a pending job
#[utoipa::path(
    post,
    path = "/jobs/{id}/start",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job started", body = MaintenanceJob),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job is not pending")
    )
)]
pub async fn start_job(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenanceJob>> {
    let job = state.services.maintenance.start_job(id).await?;
    Ok(Json(job))
}

/// Complete a job; the next one is scheduled automatically
#[utoipa::path(
    post,
    path = "/jobs/{id}/complete",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    request_body = CompleteJob,
    responses(
        (status = 200, description = "Job completed", body = CompleteResponse),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job is already completed"),
        (status = 422, description = "Usage reading below the current counter")
    )
)]
pub async fn complete_job(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<CompleteJob>,
) -> AppResult<Json<CompleteResponse>> {
    request.validate()?;

    let outcome = state.services.maintenance.complete_job(id, request).await?;
    Ok(Json(CompleteResponse {
        job: outcome.job,
        successor: outcome.successor,
    }))
}

/// Administrative reversal of a completion
#[utoipa::path(
    post,
    path = "/jobs/{id}/uncomplete",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job reopened", body = UncompleteResponse),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job is not completed")
    )
)]
pub async fn uncomplete_job(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<UncompleteResponse>> {
    let outcome = state.services.maintenance.uncomplete_job(id).await?;
    let warning = outcome.stale_successor.map(|successor_id| {
        format!(
            "auto-created successor job {} is still active; resolve the overlap manually",
            successor_id
        )
    });
    Ok(Json(UncompleteResponse {
        job: outcome.job,
        stale_successor: outcome.stale_successor,
        warning,
    }))
}

/// Administrative due-date correction
#[utoipa::path(
    put,
    path = "/jobs/{id}/due-date",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Job rescheduled", body = MaintenanceJob),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job is completed")
    )
)]
pub async fn reschedule_job(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<RescheduleRequest>,
) -> AppResult<Json<MaintenanceJob>> {
    let job = state
        .services
        .maintenance
        .reschedule_job(id, request.due_date)
        .await?;
    Ok(Json(job))
}

/// Manually create the next job for one equipment
#[utoipa::path(
    post,
    path = "/equipment/{id}/jobs",
    tag = "jobs",
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 201, description = "Job created", body = MaintenanceJob),
        (status = 404, description = "Equipment not found"),
        (status = 409, description = "An active job already exists")
    )
)]
pub async fn force_create_job(
    State(state): State<crate::AppState>,
    Path(equipment_id): Path<i32>,
) -> AppResult<(StatusCode, Json<MaintenanceJob>)> {
    let job = state
        .services
        .maintenance
        .force_create_job(equipment_id)
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// List maintenance types
#[utoipa::path(
    get,
    path = "/maintenance-types",
    tag = "jobs",
    responses(
        (status = 200, description = "Maintenance types", body = Vec<MaintenanceType>)
    )
)]
pub async fn list_maintenance_types(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<MaintenanceType>>> {
    let types = state.services.maintenance.list_types().await?;
    Ok(Json(types))
}

/// Create a maintenance type
#[utoipa::path(
    post,
    path = "/maintenance-types",
    tag = "jobs",
    request_body = CreateMaintenanceType,
    responses(
        (status = 201, description = "Maintenance type created", body = MaintenanceType)
    )
)]
pub async fn create_maintenance_type(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateMaintenanceType>,
) -> AppResult<(StatusCode, Json<MaintenanceType>)> {
    request.validate()?;

    let created = state.services.maintenance.create_type(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
