//! Error types for Motriz server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("An active maintenance job already exists for equipment {equipment_id} (job {conflicting_job_id})")]
    DuplicateActiveJob {
        equipment_id: i32,
        conflicting_job_id: i32,
    },

    #[error("Usage reading {supplied} is below the current counter {current}")]
    UsageRegression { supplied: i64, current: i64 },

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Set when the error names a conflicting job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_job_id: Option<i32>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut conflicting_job_id = None;
        let (status, error) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database")
            }
            AppError::DuplicateActiveJob {
                conflicting_job_id: id,
                ..
            } => {
                conflicting_job_id = Some(*id);
                (StatusCode::CONFLICT, "duplicate_active_job")
            }
            AppError::UsageRegression { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "usage_regression")
            }
            AppError::InvalidTransition(_) => (StatusCode::CONFLICT, "invalid_transition"),
            AppError::Messaging(_) => (StatusCode::BAD_GATEWAY, "messaging"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        let message = match &self {
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            conflicting_job_id,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
