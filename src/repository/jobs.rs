//! Maintenance job repository: the state machine's persistence layer
//!
//! All multi-row mutations run inside a transaction and take the
//! equipment row lock first, so two concurrent creations (or a creation
//! racing a completion) cannot both see an empty active slot.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::maintenance::{
        CompleteJob, CreateMaintenanceType, JobState, MaintenanceJob, MaintenanceType, NewJob,
    },
};

/// Query filter for the job list surface
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub equipment_id: Option<i32>,
    pub state: Option<JobState>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

/// Storage contract for maintenance jobs and their reference data
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job in Pending state. Fails with `DuplicateActiveJob`
    /// when the equipment already has an active job.
    async fn insert(&self, job: &NewJob) -> AppResult<MaintenanceJob>;
    async fn get(&self, id: i32) -> AppResult<MaintenanceJob>;
    async fn active_for_equipment(&self, equipment_id: i32) -> AppResult<Option<MaintenanceJob>>;
    async fn last_completed_for_equipment(
        &self,
        equipment_id: i32,
    ) -> AppResult<Option<MaintenanceJob>>;
    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<MaintenanceJob>>;
    async fn list_active(&self) -> AppResult<Vec<MaintenanceJob>>;
    /// Pending → InProgress
    async fn start(&self, id: i32) -> AppResult<MaintenanceJob>;
    /// Apply the calendar rules: Pending → Overdue once the due date has
    /// passed, Overdue → Pending when the due date moves past today.
    /// Idempotent; returns whether the state changed.
    async fn refresh_schedule_state(&self, id: i32, today: NaiveDate) -> AppResult<bool>;
    /// Atomic completion: validates the usage reading against the
    /// equipment counter, stamps the completion fields and raises the
    /// counter, all or nothing.
    async fn complete(
        &self,
        id: i32,
        input: &CompleteJob,
        now: DateTime<Utc>,
    ) -> AppResult<MaintenanceJob>;
    /// Administrative reversal of a completion
    async fn uncomplete(&self, id: i32, today: NaiveDate) -> AppResult<MaintenanceJob>;
    /// Administrative due-date correction
    async fn reschedule(
        &self,
        id: i32,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<MaintenanceJob>;

    async fn insert_type(&self, t: &CreateMaintenanceType) -> AppResult<MaintenanceType>;
    async fn list_types(&self) -> AppResult<Vec<MaintenanceType>>;
    /// Reference type used when jobs are created automatically
    async fn ensure_default_type(&self) -> AppResult<MaintenanceType>;
}

#[derive(Clone)]
pub struct JobsRepository {
    pool: Pool<Postgres>,
}

impl JobsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn job_from_row(row: &PgRow) -> MaintenanceJob {
    MaintenanceJob {
        id: row.get("id"),
        equipment_id: row.get("equipment_id"),
        operator_id: row.get("operator_id"),
        maintenance_type_id: row.get("maintenance_type_id"),
        due_date: row.get("due_date"),
        due_usage: row.get("due_usage"),
        completed_at: row.get("completed_at"),
        completed_usage: row.get("completed_usage"),
        state: row.get::<i16, _>("state").into(),
        notes: row.get("notes"),
        cost: row.get("cost"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl JobStore for JobsRepository {
    async fn insert(&self, job: &NewJob) -> AppResult<MaintenanceJob> {
        let mut tx = self.pool.begin().await?;

        // Lock the equipment row so concurrent creations serialize
        let equipment: Option<i32> =
            sqlx::query_scalar("SELECT id FROM equipment WHERE id = $1 FOR UPDATE")
                .bind(job.equipment_id)
                .fetch_optional(&mut *tx)
                .await?;
        if equipment.is_none() {
            return Err(AppError::NotFound(format!(
                "Equipment with id {} not found",
                job.equipment_id
            )));
        }

        let conflicting: Option<i32> = sqlx::query_scalar(
            "SELECT id FROM maintenance_jobs WHERE equipment_id = $1 AND state <> $2 LIMIT 1",
        )
        .bind(job.equipment_id)
        .bind(i16::from(JobState::Completed))
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(conflicting_job_id) = conflicting {
            return Err(AppError::DuplicateActiveJob {
                equipment_id: job.equipment_id,
                conflicting_job_id,
            });
        }

        let row = sqlx::query(
            r#"
            INSERT INTO maintenance_jobs
                (equipment_id, operator_id, maintenance_type_id, due_date, due_usage, state, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(job.equipment_id)
        .bind(job.operator_id)
        .bind(job.maintenance_type_id)
        .bind(job.due_date)
        .bind(job.due_usage)
        .bind(i16::from(JobState::Pending))
        .bind(&job.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(job_from_row(&row))
    }

    async fn get(&self, id: i32) -> AppResult<MaintenanceJob> {
        let row = sqlx::query("SELECT * FROM maintenance_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))?;
        Ok(job_from_row(&row))
    }

    async fn active_for_equipment(&self, equipment_id: i32) -> AppResult<Option<MaintenanceJob>> {
        let row = sqlx::query(
            "SELECT * FROM maintenance_jobs WHERE equipment_id = $1 AND state <> $2 LIMIT 1",
        )
        .bind(equipment_id)
        .bind(i16::from(JobState::Completed))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(job_from_row))
    }

    async fn last_completed_for_equipment(
        &self,
        equipment_id: i32,
    ) -> AppResult<Option<MaintenanceJob>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM maintenance_jobs
            WHERE equipment_id = $1 AND state = $2
            ORDER BY completed_at DESC
            LIMIT 1
            "#,
        )
        .bind(equipment_id)
        .bind(i16::from(JobState::Completed))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(job_from_row))
    }

    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<MaintenanceJob>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM maintenance_jobs
            WHERE ($1::int IS NULL OR equipment_id = $1)
              AND ($2::smallint IS NULL OR state = $2)
              AND ($3::date IS NULL OR due_date >= $3)
              AND ($4::date IS NULL OR due_date <= $4)
            ORDER BY due_date DESC, id DESC
            "#,
        )
        .bind(filter.equipment_id)
        .bind(filter.state.map(i16::from))
        .bind(filter.due_from)
        .bind(filter.due_to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(job_from_row).collect())
    }

    async fn list_active(&self) -> AppResult<Vec<MaintenanceJob>> {
        let rows = sqlx::query(
            "SELECT * FROM maintenance_jobs WHERE state <> $1 ORDER BY due_date, id",
        )
        .bind(i16::from(JobState::Completed))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(job_from_row).collect())
    }

    async fn start(&self, id: i32) -> AppResult<MaintenanceJob> {
        let job = self.get(id).await?;
        if job.state != JobState::Pending {
            return Err(AppError::InvalidTransition(format!(
                "job {} is {}, only pending jobs can be started",
                id, job.state
            )));
        }

        let row = sqlx::query(
            "UPDATE maintenance_jobs SET state = $2, updated_at = NOW() WHERE id = $1 AND state = $3 RETURNING *",
        )
        .bind(id)
        .bind(i16::from(JobState::InProgress))
        .bind(i16::from(JobState::Pending))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidTransition(format!("job {} changed state concurrently", id))
        })?;

        Ok(job_from_row(&row))
    }

    async fn refresh_schedule_state(&self, id: i32, today: NaiveDate) -> AppResult<bool> {
        let overdue = sqlx::query(
            r#"
            UPDATE maintenance_jobs SET state = $2, updated_at = NOW()
            WHERE id = $1 AND completed_at IS NULL AND state = $3 AND due_date < $4
            "#,
        )
        .bind(id)
        .bind(i16::from(JobState::Overdue))
        .bind(i16::from(JobState::Pending))
        .bind(today)
        .execute(&self.pool)
        .await?;

        if overdue.rows_affected() > 0 {
            return Ok(true);
        }

        let reinstated = sqlx::query(
            r#"
            UPDATE maintenance_jobs SET state = $2, updated_at = NOW()
            WHERE id = $1 AND completed_at IS NULL AND state = $3 AND due_date >= $4
            "#,
        )
        .bind(id)
        .bind(i16::from(JobState::Pending))
        .bind(i16::from(JobState::Overdue))
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(reinstated.rows_affected() > 0)
    }

    async fn complete(
        &self,
        id: i32,
        input: &CompleteJob,
        now: DateTime<Utc>,
    ) -> AppResult<MaintenanceJob> {
        let mut tx = self.pool.begin().await?;

        let job_row = sqlx::query("SELECT equipment_id, state FROM maintenance_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))?;

        let equipment_id: i32 = job_row.get("equipment_id");
        let state = JobState::from(job_row.get::<i16, _>("state"));
        if state == JobState::Completed {
            return Err(AppError::InvalidTransition(format!(
                "job {} is already completed",
                id
            )));
        }

        // Equipment row lock first, matching insert's lock order
        let current_usage: i64 =
            sqlx::query_scalar("SELECT current_usage FROM equipment WHERE id = $1 FOR UPDATE")
                .bind(equipment_id)
                .fetch_one(&mut *tx)
                .await?;

        if input.usage < current_usage {
            return Err(AppError::UsageRegression {
                supplied: input.usage,
                current: current_usage,
            });
        }

        sqlx::query("UPDATE equipment SET current_usage = $2, updated_at = NOW() WHERE id = $1")
            .bind(equipment_id)
            .bind(input.usage)
            .execute(&mut *tx)
            .await?;

        // Guarded against a concurrent completion that won the equipment
        // lock first.
        let row = sqlx::query(
            r#"
            UPDATE maintenance_jobs
            SET state = $2,
                completed_at = $3,
                completed_usage = $4,
                cost = COALESCE($5, cost),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1 AND state <> $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(i16::from(JobState::Completed))
        .bind(now)
        .bind(input.usage)
        .bind(input.cost)
        .bind(&input.notes)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidTransition(format!("job {} was completed concurrently", id))
        })?;

        tx.commit().await?;
        Ok(job_from_row(&row))
    }

    async fn uncomplete(&self, id: i32, today: NaiveDate) -> AppResult<MaintenanceJob> {
        let job = self.get(id).await?;
        if job.state != JobState::Completed {
            return Err(AppError::InvalidTransition(format!(
                "job {} is not completed",
                id
            )));
        }

        let reopened_state = if job.due_date < today {
            JobState::Overdue
        } else {
            JobState::Pending
        };

        let row = sqlx::query(
            r#"
            UPDATE maintenance_jobs
            SET state = $2, completed_at = NULL, completed_usage = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(i16::from(reopened_state))
        .fetch_one(&self.pool)
        .await?;

        Ok(job_from_row(&row))
    }

    async fn reschedule(
        &self,
        id: i32,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<MaintenanceJob> {
        let job = self.get(id).await?;
        if job.state == JobState::Completed {
            return Err(AppError::InvalidTransition(format!(
                "job {} is completed and cannot be rescheduled",
                id
            )));
        }

        let state = match job.state {
            JobState::InProgress => JobState::InProgress,
            _ if due_date < today => JobState::Overdue,
            _ => JobState::Pending,
        };

        let row = sqlx::query(
            "UPDATE maintenance_jobs SET due_date = $2, state = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(due_date)
        .bind(i16::from(state))
        .fetch_one(&self.pool)
        .await?;

        Ok(job_from_row(&row))
    }

    async fn insert_type(&self, t: &CreateMaintenanceType) -> AppResult<MaintenanceType> {
        let created = sqlx::query_as::<_, MaintenanceType>(
            "INSERT INTO maintenance_types (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(&t.name)
        .bind(&t.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_types(&self) -> AppResult<Vec<MaintenanceType>> {
        let rows =
            sqlx::query_as::<_, MaintenanceType>("SELECT * FROM maintenance_types ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn ensure_default_type(&self) -> AppResult<MaintenanceType> {
        if let Some(existing) =
            sqlx::query_as::<_, MaintenanceType>("SELECT * FROM maintenance_types ORDER BY id LIMIT 1")
                .fetch_optional(&self.pool)
                .await?
        {
            return Ok(existing);
        }

        let created = sqlx::query_as::<_, MaintenanceType>(
            r#"
            INSERT INTO maintenance_types (name, description)
            VALUES ('Preventive maintenance', 'Standard preventive maintenance')
            ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
            RETURNING *
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}
