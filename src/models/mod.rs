//! Data models for Motriz

pub mod equipment;
pub mod maintenance;
pub mod notification;
pub mod operator;

// Re-export commonly used types
pub use equipment::Equipment;
pub use maintenance::{JobState, MaintenanceJob, MaintenanceType, NewJob};
pub use notification::{
    DeliveryResult, NewNotification, NotificationKind, NotificationRecord, NotificationState,
};
pub use operator::{Operator, Supervisor};
