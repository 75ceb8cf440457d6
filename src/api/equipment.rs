//! Equipment registry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        equipment::{CreateEquipment, Equipment, RecordUsage},
        maintenance::MaintenanceJob,
    },
    services::due::DueProjection,
};

/// Registration response: the equipment plus its automatically
/// scheduled first job, when one could be created
#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub equipment: Equipment,
    pub first_job: Option<MaintenanceJob>,
}

/// Register a new piece of equipment
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment registered", body = RegisterResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn register_equipment(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    request.validate()?;

    let (equipment, first_job) = state.services.equipment.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            equipment,
            first_job,
        }),
    ))
}

/// List all equipment
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    responses(
        (status = 200, description = "All equipment", body = Vec<Equipment>)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Equipment>>> {
    let equipment = state.services.equipment.list().await?;
    Ok(Json(equipment))
}

/// Get one piece of equipment
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment", body = Equipment),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.get(id).await?;
    Ok(Json(equipment))
}

/// Record an odometer reading
#[utoipa::path(
    post,
    path = "/equipment/{id}/usage",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = RecordUsage,
    responses(
        (status = 200, description = "Usage recorded", body = Equipment),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Reading below the current counter")
    )
)]
pub async fn record_usage(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<RecordUsage>,
) -> AppResult<Json<Equipment>> {
    request.validate()?;

    let equipment = state.services.equipment.record_usage(id, request).await?;
    Ok(Json(equipment))
}

/// Where the equipment stands against its next maintenance
#[utoipa::path(
    get,
    path = "/equipment/{id}/due",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Due projection", body = DueProjection),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn due_projection(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<DueProjection>> {
    let projection = state.services.equipment.due_projection(id).await?;
    Ok(Json(projection))
}
