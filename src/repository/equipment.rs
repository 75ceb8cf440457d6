//! Equipment repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::equipment::{CreateEquipment, Equipment},
};

/// Storage contract for the equipment registry
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    async fn insert(&self, equipment: &CreateEquipment) -> AppResult<Equipment>;
    async fn get(&self, id: i32) -> AppResult<Equipment>;
    async fn list(&self) -> AppResult<Vec<Equipment>>;
    async fn list_active(&self) -> AppResult<Vec<Equipment>>;
    /// Apply an odometer reading. Monotonic: a lower value is rejected
    /// with `UsageRegression` unless `allow_correction` is set, in which
    /// case the regression is applied and logged for audit.
    async fn record_usage(
        &self,
        id: i32,
        usage: i64,
        allow_correction: bool,
    ) -> AppResult<Equipment>;
}

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EquipmentStore for EquipmentRepository {
    async fn insert(&self, equipment: &CreateEquipment) -> AppResult<Equipment> {
        let created = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (plate, brand, model, year, tank_capacity, current_usage, active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING *
            "#,
        )
        .bind(&equipment.plate)
        .bind(&equipment.brand)
        .bind(&equipment.model)
        .bind(equipment.year.unwrap_or(2023))
        .bind(equipment.tank_capacity.unwrap_or(10))
        .bind(equipment.current_usage.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))
    }

    async fn list(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY plate")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_active(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE active = TRUE ORDER BY plate",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn record_usage(
        &self,
        id: i32,
        usage: i64,
        allow_correction: bool,
    ) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let current: i64 =
            sqlx::query_scalar("SELECT current_usage FROM equipment WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))?;

        if usage < current {
            if !allow_correction {
                return Err(AppError::UsageRegression {
                    supplied: usage,
                    current,
                });
            }
            tracing::warn!(
                equipment_id = id,
                from = current,
                to = usage,
                "usage counter corrected backwards"
            );
        }

        // Corrections overwrite; normal readings merge monotonically so a
        // concurrent higher reading is never lost.
        let updated = if allow_correction {
            sqlx::query_as::<_, Equipment>(
                "UPDATE equipment SET current_usage = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
            )
        } else {
            sqlx::query_as::<_, Equipment>(
                "UPDATE equipment SET current_usage = GREATEST(current_usage, $2), updated_at = NOW() WHERE id = $1 RETURNING *",
            )
        }
        .bind(id)
        .bind(usage)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}
