//! Notification dispatcher
//!
//! Two passes driven by the scheduler: an evaluation pass that turns
//! due-soon and overdue jobs into Pending ledger records behind the
//! per-day idempotency guard, and a delivery pass that pushes Pending
//! records through the messenger, recording the outcome per record.
//! Failed records stay queryable and are only retried on explicit
//! resend.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    config::NotificationChannel,
    error::{AppError, AppResult},
    models::{
        maintenance::{JobState, MaintenanceJob},
        notification::{DeliveryResult, NewNotification, NotificationKind, NotificationRecord,
            NotificationState,
        },
        Equipment, Operator, Supervisor,
    },
    repository::{DirectoryStore, EquipmentStore, JobStore, NotificationFilter, NotificationStore},
    services::{clock::Clock, due::DueCalculator, messenger::Messenger},
};

#[derive(Clone)]
pub struct NotifierService {
    notifications: Arc<dyn NotificationStore>,
    jobs: Arc<dyn JobStore>,
    equipment: Arc<dyn EquipmentStore>,
    directory: Arc<dyn DirectoryStore>,
    messenger: Arc<dyn Messenger>,
    calculator: DueCalculator,
    channel: NotificationChannel,
    clock: Arc<dyn Clock>,
}

impl NotifierService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        jobs: Arc<dyn JobStore>,
        equipment: Arc<dyn EquipmentStore>,
        directory: Arc<dyn DirectoryStore>,
        messenger: Arc<dyn Messenger>,
        calculator: DueCalculator,
        channel: NotificationChannel,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notifications,
            jobs,
            equipment,
            directory,
            messenger,
            calculator,
            channel,
            clock,
        }
    }

    pub async fn get(&self, id: i32) -> AppResult<NotificationRecord> {
        self.notifications.get(id).await
    }

    pub async fn list(&self, filter: &NotificationFilter) -> AppResult<Vec<NotificationRecord>> {
        self.notifications.list(filter).await
    }

    /// Evaluation pass: create ledger records for every job that needs a
    /// reminder or an escalation today. A job that fails to evaluate is
    /// skipped and logged; it never stops the pass.
    pub async fn evaluate_and_enqueue(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<NotificationRecord>> {
        let type_names: HashMap<i32, String> = self
            .jobs
            .list_types()
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let mut created = Vec::new();
        for job in self.jobs.list_active().await? {
            match self.evaluate_job(&job, &type_names, now).await {
                Ok(mut records) => created.append(&mut records),
                Err(e) => {
                    tracing::error!(job_id = job.id, error = %e, "notification evaluation failed for job");
                }
            }
        }
        Ok(created)
    }

    async fn evaluate_job(
        &self,
        job: &MaintenanceJob,
        type_names: &HashMap<i32, String>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<NotificationRecord>> {
        let today = now.date_naive();
        let equipment = self.equipment.get(job.equipment_id).await?;
        let projection = self.calculator.projection(job, &equipment, today);
        let type_name = type_names
            .get(&job.maintenance_type_id)
            .map(String::as_str)
            .unwrap_or("Maintenance");

        let mut created = Vec::new();

        // Reminders go to the operator; jobs already in progress are
        // being worked on and are left alone.
        if job.state != JobState::InProgress && projection.due_soon(self.calculator.policy()) {
            let operator = self.directory.get_operator(job.operator_id).await?;
            let record = self
                .notifications
                .insert_guarded(&NewNotification {
                    job_id: Some(job.id),
                    kind: NotificationKind::Reminder,
                    recipient: self.operator_contact(&operator),
                    subject: format!("Maintenance reminder - {}", equipment.plate),
                    body: reminder_body(&operator, &equipment, job, type_name),
                    scheduled_for: now,
                })
                .await?;
            created.extend(record);
        }

        // Escalations go to every active supervisor once the grace
        // period has elapsed.
        if job.state == JobState::Overdue
            && job.days_overdue(today) >= self.calculator.policy().escalation_grace_days
        {
            let operator = self.directory.get_operator(job.operator_id).await?;
            for supervisor in self.directory.list_active_supervisors().await? {
                let record = self
                    .notifications
                    .insert_guarded(&NewNotification {
                        job_id: Some(job.id),
                        kind: NotificationKind::Escalation,
                        recipient: self.supervisor_contact(&supervisor),
                        subject: format!("ALERT: Overdue maintenance - {}", equipment.plate),
                        body: escalation_body(&operator, &equipment, job, job.days_overdue(today)),
                        scheduled_for: now,
                    })
                    .await?;
                created.extend(record);
            }
        }

        Ok(created)
    }

    /// Delivery pass: send every Pending record whose time has come. A
    /// failed send (or a failed ledger write) is recorded and the pass
    /// moves on.
    pub async fn flush_pending(&self, now: DateTime<Utc>) -> AppResult<Vec<DeliveryResult>> {
        let mut results = Vec::new();
        for record in self.notifications.list_deliverable(now).await? {
            results.push(self.deliver(&record, now).await);
        }
        Ok(results)
    }

    async fn deliver(&self, record: &NotificationRecord, now: DateTime<Utc>) -> DeliveryResult {
        match self
            .messenger
            .send(&record.recipient, &record.subject, &record.body)
            .await
        {
            Ok(()) => {
                if let Err(e) = self.notifications.mark_sent(record.id, now).await {
                    tracing::error!(notification_id = record.id, error = %e, "failed to record delivery");
                }
                DeliveryResult {
                    notification_id: record.id,
                    sent: true,
                    error: None,
                }
            }
            Err(send_error) => {
                tracing::error!(
                    notification_id = record.id,
                    recipient = %record.recipient,
                    error = %send_error,
                    "notification delivery failed"
                );
                if let Err(e) = self
                    .notifications
                    .mark_failed(record.id, &send_error.to_string())
                    .await
                {
                    tracing::error!(notification_id = record.id, error = %e, "failed to record delivery failure");
                }
                DeliveryResult {
                    notification_id: record.id,
                    sent: false,
                    error: Some(send_error.to_string()),
                }
            }
        }
    }

    /// Manual re-send of a Pending or Failed record
    pub async fn resend(&self, id: i32) -> AppResult<DeliveryResult> {
        let record = self.notifications.get(id).await?;
        if record.state == NotificationState::Sent {
            return Err(AppError::InvalidTransition(format!(
                "notification {} was already sent",
                id
            )));
        }
        Ok(self.deliver(&record, self.clock.now()).await)
    }

    fn operator_contact(&self, operator: &Operator) -> String {
        match self.channel {
            NotificationChannel::Whatsapp => operator
                .phone
                .clone()
                .unwrap_or_else(|| operator.email.clone()),
            NotificationChannel::Email => operator.email.clone(),
        }
    }

    fn supervisor_contact(&self, supervisor: &Supervisor) -> String {
        match self.channel {
            NotificationChannel::Whatsapp => supervisor
                .phone
                .clone()
                .unwrap_or_else(|| supervisor.email.clone()),
            NotificationChannel::Email => supervisor.email.clone(),
        }
    }
}

fn reminder_body(
    operator: &Operator,
    equipment: &Equipment,
    job: &MaintenanceJob,
    type_name: &str,
) -> String {
    format!(
        "Dear {},\n\n\
         Equipment {} ({} {}) is due for maintenance.\n\n\
         Details:\n\
         - Due date: {}\n\
         - Due odometer: {} km\n\
         - Current odometer: {} km\n\
         - Maintenance type: {}\n\n\
         Please schedule the maintenance as soon as possible.\n\n\
         Motriz Maintenance System",
        operator.name,
        equipment.plate,
        equipment.brand,
        equipment.model,
        job.due_date,
        job.due_usage,
        equipment.current_usage,
        type_name,
    )
}

fn escalation_body(
    operator: &Operator,
    equipment: &Equipment,
    job: &MaintenanceJob,
    days_overdue: i64,
) -> String {
    format!(
        "Maintenance job {} for equipment {} ({} {}) is {} day(s) overdue.\n\n\
         - Due date: {}\n\
         - Due odometer: {} km\n\
         - Responsible operator: {} <{}>\n\n\
         Please follow up with the operator.\n\n\
         Motriz Maintenance System",
        job.id,
        equipment.plate,
        equipment.brand,
        equipment.model,
        days_overdue,
        job.due_date,
        job.due_usage,
        operator.name,
        operator.email,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixtures() -> (Operator, Equipment, MaintenanceJob) {
        let operator = Operator {
            id: 1,
            name: "Ana Rojas".to_string(),
            email: "ana@fleet.test".to_string(),
            phone: Some("3115550134".to_string()),
            active: true,
        };
        let equipment = Equipment {
            id: 2,
            plate: "XYZ-987".to_string(),
            brand: "Chevrolet".to_string(),
            model: "NPR".to_string(),
            year: 2020,
            tank_capacity: 30,
            current_usage: 9_900,
            active: true,
            created_at: None,
            updated_at: None,
        };
        let job = MaintenanceJob {
            id: 3,
            equipment_id: 2,
            operator_id: 1,
            maintenance_type_id: 1,
            due_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            due_usage: 10_000,
            completed_at: None,
            completed_usage: None,
            state: JobState::Overdue,
            notes: None,
            cost: None,
            created_at: None,
            updated_at: None,
        };
        (operator, equipment, job)
    }

    #[test]
    fn test_reminder_body_names_equipment_and_thresholds() {
        let (operator, equipment, job) = fixtures();
        let body = reminder_body(&operator, &equipment, &job, "Preventive maintenance");
        assert!(body.contains("XYZ-987"));
        assert!(body.contains("2024-06-01"));
        assert!(body.contains("10000 km"));
        assert!(body.contains("Preventive maintenance"));
    }

    #[test]
    fn test_escalation_body_names_operator_and_delay() {
        let (operator, equipment, job) = fixtures();
        let body = escalation_body(&operator, &equipment, &job, 4);
        assert!(body.contains("4 day(s) overdue"));
        assert!(body.contains("Ana Rojas"));
        assert!(body.contains("ana@fleet.test"));
    }
}
