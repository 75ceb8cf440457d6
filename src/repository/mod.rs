//! Repository layer for database operations

pub mod equipment;
pub mod jobs;
pub mod memory;
pub mod notifications;
pub mod operators;

pub use equipment::EquipmentStore;
pub use jobs::{JobFilter, JobStore};
pub use memory::MemoryStore;
pub use notifications::{NotificationFilter, NotificationStore};
pub use operators::DirectoryStore;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub equipment: equipment::EquipmentRepository,
    pub jobs: jobs::JobsRepository,
    pub notifications: notifications::NotificationsRepository,
    pub directory: operators::OperatorsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            jobs: jobs::JobsRepository::new(pool.clone()),
            notifications: notifications::NotificationsRepository::new(pool.clone()),
            directory: operators::OperatorsRepository::new(pool.clone()),
            pool,
        }
    }
}
