//! Operator and supervisor directory endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::operator::{CreateOperator, CreateSupervisor, Operator, Supervisor},
    repository::DirectoryStore,
};

/// List operators
#[utoipa::path(
    get,
    path = "/operators",
    tag = "directory",
    responses(
        (status = 200, description = "Operators", body = Vec<Operator>)
    )
)]
pub async fn list_operators(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Operator>>> {
    let operators = state.services.directory.list_operators().await?;
    Ok(Json(operators))
}

/// Create an operator
#[utoipa::path(
    post,
    path = "/operators",
    tag = "directory",
    request_body = CreateOperator,
    responses(
        (status = 201, description = "Operator created", body = Operator),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_operator(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateOperator>,
) -> AppResult<(StatusCode, Json<Operator>)> {
    request.validate()?;

    let created = state.services.directory.insert_operator(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List supervisors
#[utoipa::path(
    get,
    path = "/supervisors",
    tag = "directory",
    responses(
        (status = 200, description = "Supervisors", body = Vec<Supervisor>)
    )
)]
pub async fn list_supervisors(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Supervisor>>> {
    let supervisors = state.services.directory.list_supervisors().await?;
    Ok(Json(supervisors))
}

/// Create a supervisor
#[utoipa::path(
    post,
    path = "/supervisors",
    tag = "directory",
    request_body = CreateSupervisor,
    responses(
        (status = 201, description = "Supervisor created", body = Supervisor),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_supervisor(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateSupervisor>,
) -> AppResult<(StatusCode, Json<Supervisor>)> {
    request.validate()?;

    let created = state.services.directory.insert_supervisor(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
