//! Equipment registry service

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        equipment::{CreateEquipment, Equipment, RecordUsage},
        maintenance::MaintenanceJob,
    },
    repository::{EquipmentStore, JobStore},
    services::{
        clock::Clock,
        due::{DueCalculator, DueProjection},
        maintenance::MaintenanceService,
    },
};

#[derive(Clone)]
pub struct EquipmentService {
    store: Arc<dyn EquipmentStore>,
    jobs: Arc<dyn JobStore>,
    maintenance: MaintenanceService,
    calculator: DueCalculator,
    clock: Arc<dyn Clock>,
}

impl EquipmentService {
    pub fn new(
        store: Arc<dyn EquipmentStore>,
        jobs: Arc<dyn JobStore>,
        maintenance: MaintenanceService,
        calculator: DueCalculator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            jobs,
            maintenance,
            calculator,
            clock,
        }
    }

    /// Register new equipment; its first maintenance job is scheduled
    /// immediately when an operator is available.
    pub async fn register(
        &self,
        equipment: CreateEquipment,
    ) -> AppResult<(Equipment, Option<MaintenanceJob>)> {
        let created = self.store.insert(&equipment).await?;
        tracing::info!(equipment_id = created.id, plate = %created.plate, "equipment registered");

        let first_job = self.maintenance.ensure_job_for_equipment(&created).await?;
        Ok((created, first_job))
    }

    pub async fn get(&self, id: i32) -> AppResult<Equipment> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        self.store.list().await
    }

    /// Apply an odometer reading from fuel/usage logging
    pub async fn record_usage(&self, id: i32, reading: RecordUsage) -> AppResult<Equipment> {
        self.store
            .record_usage(id, reading.usage, reading.allow_correction)
            .await
    }

    /// Where the equipment stands against its next maintenance, from the
    /// active job when one exists, otherwise projected from history.
    pub async fn due_projection(&self, id: i32) -> AppResult<DueProjection> {
        let equipment = self.store.get(id).await?;
        let today = self.clock.today();

        if let Some(job) = self.jobs.active_for_equipment(id).await? {
            return Ok(self.calculator.projection(&job, &equipment, today));
        }

        let last_completed = self.jobs.last_completed_for_equipment(id).await?;
        let due = self
            .calculator
            .next_due(&equipment, last_completed.as_ref(), today);
        Ok(DueProjection {
            due_date: due.due_date,
            due_usage: due.due_usage,
            days_remaining: (due.due_date - today).num_days(),
            usage_remaining: due.due_usage - equipment.current_usage,
        })
    }
}
