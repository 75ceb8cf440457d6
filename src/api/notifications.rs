//! Notification ledger endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::notification::{DeliveryResult, NotificationKind, NotificationRecord, NotificationState},
    repository::NotificationFilter,
};

/// Notification list query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct NotificationsQuery {
    pub job_id: Option<i32>,
    pub state: Option<NotificationState>,
    pub kind: Option<NotificationKind>,
}

/// List notification records
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    params(NotificationsQuery),
    responses(
        (status = 200, description = "Matching records", body = Vec<NotificationRecord>)
    )
)]
pub async fn list_notifications(
    State(state): State<crate::AppState>,
    Query(query): Query<NotificationsQuery>,
) -> AppResult<Json<Vec<NotificationRecord>>> {
    let filter = NotificationFilter {
        job_id: query.job_id,
        state: query.state,
        kind: query.kind,
    };
    let records = state.services.notifier.list(&filter).await?;
    Ok(Json(records))
}

/// Get one notification record
#[utoipa::path(
    get,
    path = "/notifications/{id}",
    tag = "notifications",
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Record", body = NotificationRecord),
        (status = 404, description = "Record not found")
    )
)]
pub async fn get_notification(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<NotificationRecord>> {
    let record = state.services.notifier.get(id).await?;
    Ok(Json(record))
}

/// Manually re-send a pending or failed notification
#[utoipa::path(
    post,
    path = "/notifications/{id}/resend",
    tag = "notifications",
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Delivery attempted", body = DeliveryResult),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Record was already sent")
    )
)]
pub async fn resend_notification(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<DeliveryResult>> {
    let result = state.services.notifier.resend(id).await?;
    Ok(Json(result))
}
