//! Maintenance job lifecycle service
//!
//! Owns every transition of the job state machine and the completion
//! cascade: completing a job schedules the successor from the due
//! calculator in the same call, so the chain of maintenances never
//! depends on a background hook firing.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        maintenance::{
            CompleteJob, CreateMaintenanceType, MaintenanceJob, MaintenanceType, NewJob,
        },
        Equipment,
    },
    repository::{EquipmentStore, DirectoryStore, JobFilter, JobStore},
    services::{clock::Clock, due::DueCalculator},
};

/// Result of completing a job
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub job: MaintenanceJob,
    /// The automatically scheduled follow-up, when one could be created
    pub successor: Option<MaintenanceJob>,
}

/// Result of the administrative uncomplete operation
#[derive(Debug, Clone)]
pub struct UncompleteOutcome {
    pub job: MaintenanceJob,
    /// Id of the auto-created successor left in place, for operator
    /// attention: the reopened job and the successor are now both active.
    pub stale_successor: Option<i32>,
}

#[derive(Clone)]
pub struct MaintenanceService {
    jobs: Arc<dyn JobStore>,
    equipment: Arc<dyn EquipmentStore>,
    directory: Arc<dyn DirectoryStore>,
    calculator: DueCalculator,
    clock: Arc<dyn Clock>,
}

impl MaintenanceService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        equipment: Arc<dyn EquipmentStore>,
        directory: Arc<dyn DirectoryStore>,
        calculator: DueCalculator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jobs,
            equipment,
            directory,
            calculator,
            clock,
        }
    }

    pub async fn get_job(&self, id: i32) -> AppResult<MaintenanceJob> {
        self.jobs.get(id).await
    }

    pub async fn list_jobs(&self, filter: &JobFilter) -> AppResult<Vec<MaintenanceJob>> {
        self.jobs.list(filter).await
    }

    pub async fn list_types(&self) -> AppResult<Vec<MaintenanceType>> {
        self.jobs.list_types().await
    }

    pub async fn create_type(&self, t: CreateMaintenanceType) -> AppResult<MaintenanceType> {
        self.jobs.insert_type(&t).await
    }

    /// Pending → InProgress
    pub async fn start_job(&self, id: i32) -> AppResult<MaintenanceJob> {
        self.jobs.start(id).await
    }

    /// Complete a job and schedule the successor
    pub async fn complete_job(&self, id: i32, input: CompleteJob) -> AppResult<CompletionOutcome> {
        if input.cost.is_some_and(|c| c < Decimal::ZERO) {
            return Err(AppError::Validation("cost must not be negative".to_string()));
        }

        let now = self.clock.now();
        let job = self.jobs.complete(id, &input, now).await?;
        tracing::info!(job_id = job.id, equipment_id = job.equipment_id, "maintenance job completed");

        // The completed job frees the active slot, so scheduling the
        // successor is expected to succeed; if it races a manual
        // creation, the next scheduler tick repairs the gap.
        let successor = match self.schedule_successor(&job).await {
            Ok(successor) => Some(successor),
            Err(e) => {
                tracing::warn!(
                    job_id = job.id,
                    error = %e,
                    "could not schedule successor job"
                );
                None
            }
        };

        Ok(CompletionOutcome { job, successor })
    }

    async fn schedule_successor(&self, completed: &MaintenanceJob) -> AppResult<MaintenanceJob> {
        let equipment = self.equipment.get(completed.equipment_id).await?;
        let due = self
            .calculator
            .next_due(&equipment, Some(completed), self.clock.today());

        self.jobs
            .insert(&NewJob {
                equipment_id: completed.equipment_id,
                operator_id: completed.operator_id,
                maintenance_type_id: completed.maintenance_type_id,
                due_date: due.due_date,
                due_usage: due.due_usage,
                notes: None,
            })
            .await
    }

    /// Administrative reversal. The auto-created successor is left in
    /// place and reported back so an operator can resolve the overlap.
    pub async fn uncomplete_job(&self, id: i32) -> AppResult<UncompleteOutcome> {
        let completed = self.jobs.get(id).await?;
        let successor = self
            .jobs
            .active_for_equipment(completed.equipment_id)
            .await?;

        let job = self.jobs.uncomplete(id, self.clock.today()).await?;

        let stale_successor = successor.map(|s| s.id);
        if let Some(successor_id) = stale_successor {
            tracing::warn!(
                job_id = job.id,
                successor_id,
                "job reopened while its auto-created successor is still active"
            );
        }

        Ok(UncompleteOutcome {
            job,
            stale_successor,
        })
    }

    /// Administrative due-date correction; moving the date past today
    /// flips an Overdue job back to Pending.
    pub async fn reschedule_job(
        &self,
        id: i32,
        due_date: chrono::NaiveDate,
    ) -> AppResult<MaintenanceJob> {
        self.jobs.reschedule(id, due_date, self.clock.today()).await
    }

    /// Manual creation for one equipment, honoring the one-active-job
    /// invariant.
    pub async fn force_create_job(&self, equipment_id: i32) -> AppResult<MaintenanceJob> {
        let equipment = self.equipment.get(equipment_id).await?;
        match self.create_next_job(&equipment).await? {
            Some(job) => Ok(job),
            None => Err(AppError::Validation(
                "no active operator available to assign the job to".to_string(),
            )),
        }
    }

    /// Create the next job for equipment with no active one. Returns
    /// None when no operator can be assigned yet.
    pub async fn ensure_job_for_equipment(
        &self,
        equipment: &Equipment,
    ) -> AppResult<Option<MaintenanceJob>> {
        if self
            .jobs
            .active_for_equipment(equipment.id)
            .await?
            .is_some()
        {
            return Ok(None);
        }
        self.create_next_job(equipment).await
    }

    async fn create_next_job(&self, equipment: &Equipment) -> AppResult<Option<MaintenanceJob>> {
        let last_completed = self
            .jobs
            .last_completed_for_equipment(equipment.id)
            .await?;

        let operator_id = match &last_completed {
            Some(job) => Some(job.operator_id),
            None => self
                .directory
                .first_active_operator()
                .await?
                .map(|o| o.id),
        };
        let Some(operator_id) = operator_id else {
            tracing::warn!(
                equipment_id = equipment.id,
                "no active operator; maintenance job not created"
            );
            return Ok(None);
        };

        let maintenance_type_id = match &last_completed {
            Some(job) => job.maintenance_type_id,
            None => self.jobs.ensure_default_type().await?.id,
        };

        let due = self
            .calculator
            .next_due(equipment, last_completed.as_ref(), self.clock.today());

        let job = self
            .jobs
            .insert(&NewJob {
                equipment_id: equipment.id,
                operator_id,
                maintenance_type_id,
                due_date: due.due_date,
                due_usage: due.due_usage,
                notes: None,
            })
            .await?;

        tracing::info!(
            job_id = job.id,
            equipment_id = equipment.id,
            due_date = %job.due_date,
            due_usage = job.due_usage,
            "maintenance job scheduled"
        );
        Ok(Some(job))
    }
}
