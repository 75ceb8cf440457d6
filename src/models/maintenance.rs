//! Maintenance job model and its state machine types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Maintenance job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending = 0,
    InProgress = 1,
    Completed = 2,
    Overdue = 3,
}

impl JobState {
    /// A job that still occupies the equipment's single active slot
    pub fn is_active(self) -> bool {
        !matches!(self, JobState::Completed)
    }
}

impl From<i16> for JobState {
    fn from(v: i16) -> Self {
        match v {
            1 => JobState::InProgress,
            2 => JobState::Completed,
            3 => JobState::Overdue,
            _ => JobState::Pending,
        }
    }
}

impl From<JobState> for i16 {
    fn from(s: JobState) -> Self {
        s as i16
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobState::Pending => "pending",
            JobState::InProgress => "in_progress",
            JobState::Completed => "completed",
            JobState::Overdue => "overdue",
        };
        write!(f, "{}", label)
    }
}

/// Maintenance type reference data
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenanceType {
    pub id: i32,
    pub name: String,
    pub description: String,
}

/// Create maintenance type request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaintenanceType {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One scheduled or completed maintenance event for one equipment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceJob {
    pub id: i32,
    pub equipment_id: i32,
    pub operator_id: i32,
    pub maintenance_type_id: i32,
    /// Date the maintenance is scheduled for
    pub due_date: NaiveDate,
    /// Odometer threshold that triggers the maintenance
    pub due_usage: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_usage: Option<i64>,
    pub state: JobState,
    pub notes: Option<String>,
    pub cost: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MaintenanceJob {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Days past the due date, zero when not overdue
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.state == JobState::Overdue {
            (today - self.due_date).num_days().max(0)
        } else {
            0
        }
    }
}

/// Fields for a new job; state always starts at Pending
#[derive(Debug, Clone)]
pub struct NewJob {
    pub equipment_id: i32,
    pub operator_id: i32,
    pub maintenance_type_id: i32,
    pub due_date: NaiveDate,
    pub due_usage: i64,
    pub notes: Option<String>,
}

/// Completion input for a job
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CompleteJob {
    /// Odometer reading at completion time
    #[validate(range(min = 0))]
    pub usage: i64,
    /// Non-negative, checked by the service
    pub cost: Option<Decimal>,
    pub notes: Option<String>,
}
