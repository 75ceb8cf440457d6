//! Scheduler driver
//!
//! One tick walks the whole fleet: overdue transitions first, then
//! missing-job repair, then the notification passes. Each equipment is
//! evaluated independently; a failure there is logged, counted as an
//! anomaly and never stops the tick. Running a tick twice in a row is a
//! no-op thanks to the idempotency guards downstream.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::Equipment,
    repository::{EquipmentStore, JobStore},
    services::{clock::Clock, maintenance::MaintenanceService, notifier::NotifierService},
};

/// Structured outcome of one driver tick
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct TickSummary {
    /// Jobs transitioned Pending → Overdue
    pub jobs_overdue: u32,
    /// Jobs created for equipment with no active job
    pub jobs_created: u32,
    /// Notification records enqueued by the evaluation pass
    pub notifications_enqueued: u32,
    pub notifications_sent: u32,
    pub notifications_failed: u32,
    /// Equipment or passes skipped because of unexpected errors
    pub anomalies: u32,
}

pub struct SchedulerService {
    equipment: Arc<dyn EquipmentStore>,
    jobs: Arc<dyn JobStore>,
    maintenance: MaintenanceService,
    notifier: NotifierService,
    clock: Arc<dyn Clock>,
}

impl SchedulerService {
    pub fn new(
        equipment: Arc<dyn EquipmentStore>,
        jobs: Arc<dyn JobStore>,
        maintenance: MaintenanceService,
        notifier: NotifierService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            equipment,
            jobs,
            maintenance,
            notifier,
            clock,
        }
    }

    /// One full evaluation of the fleet
    pub async fn tick(&self) -> AppResult<TickSummary> {
        let now = self.clock.now();
        let today = now.date_naive();
        let mut summary = TickSummary::default();

        for equipment in self.equipment.list_active().await? {
            match self.evaluate_equipment(&equipment, today).await {
                Ok((became_overdue, created)) => {
                    if became_overdue {
                        summary.jobs_overdue += 1;
                    }
                    if created {
                        summary.jobs_created += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        equipment_id = equipment.id,
                        plate = %equipment.plate,
                        error = %e,
                        "equipment evaluation failed"
                    );
                    summary.anomalies += 1;
                }
            }
        }

        match self.notifier.evaluate_and_enqueue(now).await {
            Ok(created) => summary.notifications_enqueued = created.len() as u32,
            Err(e) => {
                tracing::error!(error = %e, "notification evaluation pass failed");
                summary.anomalies += 1;
            }
        }

        match self.notifier.flush_pending(now).await {
            Ok(results) => {
                for result in &results {
                    if result.sent {
                        summary.notifications_sent += 1;
                    } else {
                        summary.notifications_failed += 1;
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "notification delivery pass failed");
                summary.anomalies += 1;
            }
        }

        tracing::info!(
            jobs_overdue = summary.jobs_overdue,
            jobs_created = summary.jobs_created,
            notifications_enqueued = summary.notifications_enqueued,
            notifications_sent = summary.notifications_sent,
            notifications_failed = summary.notifications_failed,
            anomalies = summary.anomalies,
            "scheduler tick finished"
        );
        Ok(summary)
    }

    async fn evaluate_equipment(
        &self,
        equipment: &Equipment,
        today: NaiveDate,
    ) -> AppResult<(bool, bool)> {
        if let Some(job) = self.jobs.active_for_equipment(equipment.id).await? {
            let changed = self.jobs.refresh_schedule_state(job.id, today).await?;
            // Only a Pending job can have moved to Overdue; the reverse
            // direction is an administrative correction, not a tick event.
            let became_overdue = changed && job.state == crate::models::JobState::Pending;
            Ok((became_overdue, false))
        } else {
            let created = self.maintenance.ensure_job_for_equipment(equipment).await?;
            Ok((false, created.is_some()))
        }
    }

    /// Periodic driver loop for the background task
    pub async fn run(self: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                tracing::error!(error = %e, "scheduler tick failed");
            }
        }
    }
}
