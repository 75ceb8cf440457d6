//! Notification ledger model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Upcoming-maintenance reminder to the operator
    Reminder = 0,
    /// Overdue alert to supervisors
    Escalation = 1,
    /// Fleet-scoped summary to supervisors
    Digest = 2,
}

impl From<i16> for NotificationKind {
    fn from(v: i16) -> Self {
        match v {
            1 => NotificationKind::Escalation,
            2 => NotificationKind::Digest,
            _ => NotificationKind::Reminder,
        }
    }
}

impl From<NotificationKind> for i16 {
    fn from(k: NotificationKind) -> Self {
        k as i16
    }
}

/// Delivery state of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum NotificationState {
    Pending = 0,
    Sent = 1,
    Failed = 2,
}

impl From<i16> for NotificationState {
    fn from(v: i16) -> Self {
        match v {
            1 => NotificationState::Sent,
            2 => NotificationState::Failed,
            _ => NotificationState::Pending,
        }
    }
}

impl From<NotificationState> for i16 {
    fn from(s: NotificationState) -> Self {
        s as i16
    }
}

/// One row of the notification audit trail. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationRecord {
    pub id: i32,
    /// Absent for fleet-scoped digests
    pub job_id: Option<i32>,
    pub kind: NotificationKind,
    pub state: NotificationState,
    /// Email address or phone number, depending on the channel
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields for a new notification; state always starts at Pending
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub job_id: Option<i32>,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub scheduled_for: DateTime<Utc>,
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryResult {
    pub notification_id: i32,
    pub sent: bool,
    pub error: Option<String>,
}
