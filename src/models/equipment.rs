//! Equipment (fleet vehicle) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    /// License plate, unique within the fleet
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    /// Fuel tank capacity in gallons
    pub tank_capacity: i32,
    /// Current odometer reading in kilometres
    pub current_usage: i64,
    /// Inactive equipment is skipped by the scheduler
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 50))]
    pub plate: String,
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    pub year: Option<i32>,
    pub tank_capacity: Option<i32>,
    #[validate(range(min = 0))]
    pub current_usage: Option<i64>,
}

/// Usage (odometer) reading for a piece of equipment
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordUsage {
    /// New odometer value in kilometres
    #[validate(range(min = 0))]
    pub usage: i64,
    /// Allow the reading to go backwards (audited administrative correction)
    #[serde(default)]
    pub allow_correction: bool,
}
