//! In-memory store implementing every storage contract
//!
//! Deterministic, dependency-free backend used by the scenario tests to
//! exercise the scheduling core without a database. A single mutex gives
//! each operation the same all-or-nothing semantics the Postgres
//! repositories get from transactions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment},
        maintenance::{
            CompleteJob, CreateMaintenanceType, JobState, MaintenanceJob, MaintenanceType, NewJob,
        },
        notification::{
            NewNotification, NotificationKind, NotificationRecord, NotificationState,
        },
        operator::{CreateOperator, CreateSupervisor, Operator, Supervisor},
    },
};

use super::{
    equipment::EquipmentStore,
    jobs::{JobFilter, JobStore},
    notifications::{NotificationFilter, NotificationStore},
    operators::DirectoryStore,
};

#[derive(Default)]
struct Inner {
    equipment: Vec<Equipment>,
    operators: Vec<Operator>,
    supervisors: Vec<Supervisor>,
    types: Vec<MaintenanceType>,
    jobs: Vec<MaintenanceJob>,
    notifications: Vec<NotificationRecord>,
    next_id: i32,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EquipmentStore for MemoryStore {
    async fn insert(&self, equipment: &CreateEquipment) -> AppResult<Equipment> {
        let mut inner = self.inner.lock().unwrap();
        let created = Equipment {
            id: inner.next_id(),
            plate: equipment.plate.clone(),
            brand: equipment.brand.clone(),
            model: equipment.model.clone(),
            year: equipment.year.unwrap_or(2023),
            tank_capacity: equipment.tank_capacity.unwrap_or(10),
            current_usage: equipment.current_usage.unwrap_or(0),
            active: true,
            created_at: None,
            updated_at: None,
        };
        inner.equipment.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: i32) -> AppResult<Equipment> {
        let inner = self.inner.lock().unwrap();
        inner
            .equipment
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))
    }

    async fn list(&self) -> AppResult<Vec<Equipment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.equipment.clone())
    }

    async fn list_active(&self) -> AppResult<Vec<Equipment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .equipment
            .iter()
            .filter(|e| e.active)
            .cloned()
            .collect())
    }

    async fn record_usage(
        &self,
        id: i32,
        usage: i64,
        allow_correction: bool,
    ) -> AppResult<Equipment> {
        let mut inner = self.inner.lock().unwrap();
        let equipment = inner
            .equipment
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))?;

        if usage < equipment.current_usage {
            if !allow_correction {
                return Err(AppError::UsageRegression {
                    supplied: usage,
                    current: equipment.current_usage,
                });
            }
            tracing::warn!(
                equipment_id = id,
                from = equipment.current_usage,
                to = usage,
                "usage counter corrected backwards"
            );
            equipment.current_usage = usage;
        } else {
            equipment.current_usage = equipment.current_usage.max(usage);
        }
        Ok(equipment.clone())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn insert_operator(&self, operator: &CreateOperator) -> AppResult<Operator> {
        let mut inner = self.inner.lock().unwrap();
        let created = Operator {
            id: inner.next_id(),
            name: operator.name.clone(),
            email: operator.email.clone(),
            phone: operator.phone.clone(),
            active: true,
        };
        inner.operators.push(created.clone());
        Ok(created)
    }

    async fn get_operator(&self, id: i32) -> AppResult<Operator> {
        let inner = self.inner.lock().unwrap();
        inner
            .operators
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Operator with id {} not found", id)))
    }

    async fn list_operators(&self) -> AppResult<Vec<Operator>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.operators.clone())
    }

    async fn first_active_operator(&self) -> AppResult<Option<Operator>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.operators.iter().find(|o| o.active).cloned())
    }

    async fn insert_supervisor(&self, supervisor: &CreateSupervisor) -> AppResult<Supervisor> {
        let mut inner = self.inner.lock().unwrap();
        let created = Supervisor {
            id: inner.next_id(),
            name: supervisor.name.clone(),
            email: supervisor.email.clone(),
            phone: supervisor.phone.clone(),
            active: true,
        };
        inner.supervisors.push(created.clone());
        Ok(created)
    }

    async fn list_supervisors(&self) -> AppResult<Vec<Supervisor>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.supervisors.clone())
    }

    async fn list_active_supervisors(&self) -> AppResult<Vec<Supervisor>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .supervisors
            .iter()
            .filter(|s| s.active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, job: &NewJob) -> AppResult<MaintenanceJob> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.equipment.iter().any(|e| e.id == job.equipment_id) {
            return Err(AppError::NotFound(format!(
                "Equipment with id {} not found",
                job.equipment_id
            )));
        }

        if let Some(conflicting) = inner
            .jobs
            .iter()
            .find(|j| j.equipment_id == job.equipment_id && j.is_active())
        {
            return Err(AppError::DuplicateActiveJob {
                equipment_id: job.equipment_id,
                conflicting_job_id: conflicting.id,
            });
        }

        let created = MaintenanceJob {
            id: inner.next_id(),
            equipment_id: job.equipment_id,
            operator_id: job.operator_id,
            maintenance_type_id: job.maintenance_type_id,
            due_date: job.due_date,
            due_usage: job.due_usage,
            completed_at: None,
            completed_usage: None,
            state: JobState::Pending,
            notes: job.notes.clone(),
            cost: None,
            created_at: None,
            updated_at: None,
        };
        inner.jobs.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: i32) -> AppResult<MaintenanceJob> {
        let inner = self.inner.lock().unwrap();
        inner
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))
    }

    async fn active_for_equipment(&self, equipment_id: i32) -> AppResult<Option<MaintenanceJob>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .iter()
            .find(|j| j.equipment_id == equipment_id && j.is_active())
            .cloned())
    }

    async fn last_completed_for_equipment(
        &self,
        equipment_id: i32,
    ) -> AppResult<Option<MaintenanceJob>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .iter()
            .filter(|j| j.equipment_id == equipment_id && j.state == JobState::Completed)
            .max_by_key(|j| j.completed_at)
            .cloned())
    }

    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<MaintenanceJob>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .iter()
            .filter(|j| {
                filter.equipment_id.map_or(true, |id| j.equipment_id == id)
                    && filter.state.map_or(true, |s| j.state == s)
                    && filter.due_from.map_or(true, |d| j.due_date >= d)
                    && filter.due_to.map_or(true, |d| j.due_date <= d)
            })
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> AppResult<Vec<MaintenanceJob>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.jobs.iter().filter(|j| j.is_active()).cloned().collect())
    }

    async fn start(&self, id: i32) -> AppResult<MaintenanceJob> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))?;
        if job.state != JobState::Pending {
            return Err(AppError::InvalidTransition(format!(
                "job {} is {}, only pending jobs can be started",
                id, job.state
            )));
        }
        job.state = JobState::InProgress;
        Ok(job.clone())
    }

    async fn refresh_schedule_state(&self, id: i32, today: NaiveDate) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))?;

        if job.completed_at.is_some() {
            return Ok(false);
        }
        match job.state {
            JobState::Pending if job.due_date < today => {
                job.state = JobState::Overdue;
                Ok(true)
            }
            JobState::Overdue if job.due_date >= today => {
                job.state = JobState::Pending;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(
        &self,
        id: i32,
        input: &CompleteJob,
        now: DateTime<Utc>,
    ) -> AppResult<MaintenanceJob> {
        let mut inner = self.inner.lock().unwrap();

        let (equipment_id, state) = {
            let job = inner
                .jobs
                .iter()
                .find(|j| j.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))?;
            (job.equipment_id, job.state)
        };
        if state == JobState::Completed {
            return Err(AppError::InvalidTransition(format!(
                "job {} is already completed",
                id
            )));
        }

        let current_usage = inner
            .equipment
            .iter()
            .find(|e| e.id == equipment_id)
            .map(|e| e.current_usage)
            .ok_or_else(|| {
                AppError::NotFound(format!("Equipment with id {} not found", equipment_id))
            })?;

        if input.usage < current_usage {
            return Err(AppError::UsageRegression {
                supplied: input.usage,
                current: current_usage,
            });
        }

        if let Some(equipment) = inner.equipment.iter_mut().find(|e| e.id == equipment_id) {
            equipment.current_usage = input.usage;
        }

        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))?;
        job.state = JobState::Completed;
        job.completed_at = Some(now);
        job.completed_usage = Some(input.usage);
        if input.cost.is_some() {
            job.cost = input.cost;
        }
        if input.notes.is_some() {
            job.notes = input.notes.clone();
        }
        Ok(job.clone())
    }

    async fn uncomplete(&self, id: i32, today: NaiveDate) -> AppResult<MaintenanceJob> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))?;
        if job.state != JobState::Completed {
            return Err(AppError::InvalidTransition(format!(
                "job {} is not completed",
                id
            )));
        }
        job.completed_at = None;
        job.completed_usage = None;
        job.state = if job.due_date < today {
            JobState::Overdue
        } else {
            JobState::Pending
        };
        Ok(job.clone())
    }

    async fn reschedule(
        &self,
        id: i32,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<MaintenanceJob> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Maintenance job {} not found", id)))?;
        if job.state == JobState::Completed {
            return Err(AppError::InvalidTransition(format!(
                "job {} is completed and cannot be rescheduled",
                id
            )));
        }
        job.due_date = due_date;
        if job.state != JobState::InProgress {
            job.state = if due_date < today {
                JobState::Overdue
            } else {
                JobState::Pending
            };
        }
        Ok(job.clone())
    }

    async fn insert_type(&self, t: &CreateMaintenanceType) -> AppResult<MaintenanceType> {
        let mut inner = self.inner.lock().unwrap();
        let created = MaintenanceType {
            id: inner.next_id(),
            name: t.name.clone(),
            description: t.description.clone(),
        };
        inner.types.push(created.clone());
        Ok(created)
    }

    async fn list_types(&self) -> AppResult<Vec<MaintenanceType>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.types.clone())
    }

    async fn ensure_default_type(&self) -> AppResult<MaintenanceType> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.types.first() {
            return Ok(existing.clone());
        }
        let created = MaintenanceType {
            id: inner.next_id(),
            name: "Preventive maintenance".to_string(),
            description: "Standard preventive maintenance".to_string(),
        };
        inner.types.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_guarded(&self, n: &NewNotification) -> AppResult<Option<NotificationRecord>> {
        let mut inner = self.inner.lock().unwrap();
        let day = n.scheduled_for.date_naive();

        let guarded = inner.notifications.iter().any(|existing| {
            existing.job_id == n.job_id
                && existing.kind == n.kind
                && existing.scheduled_for.date_naive() == day
                && (n.kind != NotificationKind::Escalation || existing.recipient == n.recipient)
        });
        if guarded {
            return Ok(None);
        }

        let created = NotificationRecord {
            id: inner.next_id(),
            job_id: n.job_id,
            kind: n.kind,
            state: NotificationState::Pending,
            recipient: n.recipient.clone(),
            subject: n.subject.clone(),
            body: n.body.clone(),
            scheduled_for: n.scheduled_for,
            sent_at: None,
            error: None,
            created_at: None,
        };
        inner.notifications.push(created.clone());
        Ok(Some(created))
    }

    async fn get(&self, id: i32) -> AppResult<NotificationRecord> {
        let inner = self.inner.lock().unwrap();
        inner
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }

    async fn list(&self, filter: &NotificationFilter) -> AppResult<Vec<NotificationRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .notifications
            .iter()
            .filter(|n| {
                filter.job_id.map_or(true, |id| n.job_id == Some(id))
                    && filter.state.map_or(true, |s| n.state == s)
                    && filter.kind.map_or(true, |k| n.kind == k)
            })
            .cloned()
            .collect())
    }

    async fn list_deliverable(&self, now: DateTime<Utc>) -> AppResult<Vec<NotificationRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .notifications
            .iter()
            .filter(|n| n.state == NotificationState::Pending && n.scheduled_for <= now)
            .cloned()
            .collect())
    }

    async fn mark_sent(&self, id: i32, now: DateTime<Utc>) -> AppResult<NotificationRecord> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;
        record.state = NotificationState::Sent;
        record.sent_at = Some(now);
        record.error = None;
        Ok(record.clone())
    }

    async fn mark_failed(&self, id: i32, error: &str) -> AppResult<NotificationRecord> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;
        record.state = NotificationState::Failed;
        record.error = Some(error.to_string());
        Ok(record.clone())
    }
}
