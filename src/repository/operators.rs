//! Operator and supervisor directory repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::operator::{CreateOperator, CreateSupervisor, Operator, Supervisor},
};

/// Read/write access to the contact directory. The scheduling core only
/// reads it; the create operations exist so the server is usable
/// stand-alone.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn insert_operator(&self, operator: &CreateOperator) -> AppResult<Operator>;
    async fn get_operator(&self, id: i32) -> AppResult<Operator>;
    async fn list_operators(&self) -> AppResult<Vec<Operator>>;
    async fn first_active_operator(&self) -> AppResult<Option<Operator>>;
    async fn insert_supervisor(&self, supervisor: &CreateSupervisor) -> AppResult<Supervisor>;
    async fn list_supervisors(&self) -> AppResult<Vec<Supervisor>>;
    async fn list_active_supervisors(&self) -> AppResult<Vec<Supervisor>>;
}

#[derive(Clone)]
pub struct OperatorsRepository {
    pool: Pool<Postgres>,
}

impl OperatorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for OperatorsRepository {
    async fn insert_operator(&self, operator: &CreateOperator) -> AppResult<Operator> {
        let created = sqlx::query_as::<_, Operator>(
            r#"
            INSERT INTO operators (name, email, phone, active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *
            "#,
        )
        .bind(&operator.name)
        .bind(&operator.email)
        .bind(&operator.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_operator(&self, id: i32) -> AppResult<Operator> {
        sqlx::query_as::<_, Operator>("SELECT * FROM operators WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Operator with id {} not found", id)))
    }

    async fn list_operators(&self) -> AppResult<Vec<Operator>> {
        let rows = sqlx::query_as::<_, Operator>("SELECT * FROM operators ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn first_active_operator(&self) -> AppResult<Option<Operator>> {
        let row = sqlx::query_as::<_, Operator>(
            "SELECT * FROM operators WHERE active = TRUE ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_supervisor(&self, supervisor: &CreateSupervisor) -> AppResult<Supervisor> {
        let created = sqlx::query_as::<_, Supervisor>(
            r#"
            INSERT INTO supervisors (name, email, phone, active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *
            "#,
        )
        .bind(&supervisor.name)
        .bind(&supervisor.email)
        .bind(&supervisor.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_supervisors(&self) -> AppResult<Vec<Supervisor>> {
        let rows = sqlx::query_as::<_, Supervisor>("SELECT * FROM supervisors ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_active_supervisors(&self) -> AppResult<Vec<Supervisor>> {
        let rows = sqlx::query_as::<_, Supervisor>(
            "SELECT * FROM supervisors WHERE active = TRUE ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
