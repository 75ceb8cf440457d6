//! Notification ledger repository
//!
//! Records are append-only: the only mutations are the delivery outcome
//! fields, and nothing is ever deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::notification::{
        NewNotification, NotificationKind, NotificationRecord, NotificationState,
    },
};

/// Query filter for the notification ledger
#[derive(Debug, Default, Clone)]
pub struct NotificationFilter {
    pub job_id: Option<i32>,
    pub state: Option<NotificationState>,
    pub kind: Option<NotificationKind>,
}

/// Storage contract for the notification ledger
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert unless the idempotency guard trips: at most one Reminder
    /// per (job, calendar day), at most one Escalation per
    /// (job, recipient, calendar day). Returns None when guarded.
    async fn insert_guarded(&self, n: &NewNotification) -> AppResult<Option<NotificationRecord>>;
    async fn get(&self, id: i32) -> AppResult<NotificationRecord>;
    async fn list(&self, filter: &NotificationFilter) -> AppResult<Vec<NotificationRecord>>;
    /// Pending records whose scheduled time has arrived
    async fn list_deliverable(&self, now: DateTime<Utc>) -> AppResult<Vec<NotificationRecord>>;
    async fn mark_sent(&self, id: i32, now: DateTime<Utc>) -> AppResult<NotificationRecord>;
    async fn mark_failed(&self, id: i32, error: &str) -> AppResult<NotificationRecord>;
}

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn notification_from_row(row: &PgRow) -> NotificationRecord {
    NotificationRecord {
        id: row.get("id"),
        job_id: row.get("job_id"),
        kind: row.get::<i16, _>("kind").into(),
        state: row.get::<i16, _>("state").into(),
        recipient: row.get("recipient"),
        subject: row.get("subject"),
        body: row.get("body"),
        scheduled_for: row.get("scheduled_for"),
        sent_at: row.get("sent_at"),
        error: row.get("error"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl NotificationStore for NotificationsRepository {
    async fn insert_guarded(&self, n: &NewNotification) -> AppResult<Option<NotificationRecord>> {
        let day = n.scheduled_for.date_naive();

        // Single statement so retried ticks racing each other cannot both
        // pass the guard.
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (job_id, kind, state, recipient, subject, body, scheduled_for)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE NOT EXISTS (
                SELECT 1 FROM notifications
                WHERE job_id IS NOT DISTINCT FROM $1
                  AND kind = $2
                  AND (scheduled_for AT TIME ZONE 'UTC')::date = $8
                  AND ($2 <> $9 OR recipient = $4)
            )
            RETURNING *
            "#,
        )
        .bind(n.job_id)
        .bind(i16::from(n.kind))
        .bind(i16::from(NotificationState::Pending))
        .bind(&n.recipient)
        .bind(&n.subject)
        .bind(&n.body)
        .bind(n.scheduled_for)
        .bind(day)
        .bind(i16::from(NotificationKind::Escalation))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(notification_from_row))
    }

    async fn get(&self, id: i32) -> AppResult<NotificationRecord> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;
        Ok(notification_from_row(&row))
    }

    async fn list(&self, filter: &NotificationFilter) -> AppResult<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM notifications
            WHERE ($1::int IS NULL OR job_id = $1)
              AND ($2::smallint IS NULL OR state = $2)
              AND ($3::smallint IS NULL OR kind = $3)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.job_id)
        .bind(filter.state.map(i16::from))
        .bind(filter.kind.map(i16::from))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(notification_from_row).collect())
    }

    async fn list_deliverable(&self, now: DateTime<Utc>) -> AppResult<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE state = $1 AND scheduled_for <= $2 ORDER BY id",
        )
        .bind(i16::from(NotificationState::Pending))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(notification_from_row).collect())
    }

    async fn mark_sent(&self, id: i32, now: DateTime<Utc>) -> AppResult<NotificationRecord> {
        let row = sqlx::query(
            "UPDATE notifications SET state = $2, sent_at = $3, error = NULL WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(i16::from(NotificationState::Sent))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;
        Ok(notification_from_row(&row))
    }

    async fn mark_failed(&self, id: i32, error: &str) -> AppResult<NotificationRecord> {
        let row = sqlx::query(
            "UPDATE notifications SET state = $2, error = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(i16::from(NotificationState::Failed))
        .bind(error)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;
        Ok(notification_from_row(&row))
    }
}
