//! Operator and supervisor directory models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Operator responsible for a piece of equipment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Operator {
    pub id: i32,
    pub name: String,
    pub email: String,
    /// Mobile number for WhatsApp delivery
    pub phone: Option<String>,
    pub active: bool,
}

/// Supervisor contact, recipient of escalation notices
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Supervisor {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub active: bool,
}

/// Create operator request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOperator {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
}

/// Create supervisor request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupervisor {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
}
