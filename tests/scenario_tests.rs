//! End-to-end scenarios for the scheduling core, run against the
//! in-memory store with a manual clock and a scripted messenger.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use motriz_server::{
    config::{MaintenancePolicy, NotificationChannel},
    error::AppError,
    models::{
        equipment::CreateEquipment,
        maintenance::{CompleteJob, JobState},
        notification::{NotificationKind, NotificationState},
        operator::{CreateOperator, CreateSupervisor},
    },
    repository::{
        DirectoryStore, EquipmentStore, JobStore, MemoryStore, NotificationFilter,
        NotificationStore,
    },
    services::{
        clock::{Clock, ManualClock},
        messenger::{Messenger, SendError},
        Services,
    },
};

/// Messenger stub that succeeds by default and fails on scripted call
/// numbers (1-based)
#[derive(Default)]
struct ScriptedMessenger {
    calls: Mutex<u32>,
    fail_on: Mutex<HashSet<u32>>,
    delivered: Mutex<Vec<String>>,
}

impl ScriptedMessenger {
    fn fail_on_call(&self, n: u32) {
        self.fail_on.lock().unwrap().insert(n);
    }

    fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for ScriptedMessenger {
    async fn send(&self, recipient: &str, _subject: &str, _body: &str) -> Result<(), SendError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if self.fail_on.lock().unwrap().contains(&call) {
            return Err(SendError("SMTP connection refused".to_string()));
        }
        self.delivered.lock().unwrap().push(recipient.to_string());
        Ok(())
    }
}

struct Harness {
    services: Services,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    messenger: Arc<ScriptedMessenger>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    ));
    let messenger = Arc::new(ScriptedMessenger::default());

    let services = Services::with_stores(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        messenger.clone(),
        MaintenancePolicy::default(),
        NotificationChannel::Email,
        clock.clone(),
    );

    Harness {
        services,
        store,
        clock,
        messenger,
    }
}

fn new_equipment(plate: &str) -> CreateEquipment {
    CreateEquipment {
        plate: plate.to_string(),
        brand: "Toyota".to_string(),
        model: "Hilux".to_string(),
        year: Some(2021),
        tank_capacity: Some(20),
        current_usage: Some(0),
    }
}

fn new_operator(name: &str, email: &str) -> CreateOperator {
    CreateOperator {
        name: name.to_string(),
        email: email.to_string(),
        phone: Some("3115550134".to_string()),
    }
}

async fn seed_operator(h: &Harness) {
    h.store
        .insert_operator(&new_operator("Ana Rojas", "ana@fleet.test"))
        .await
        .unwrap();
}

#[tokio::test]
async fn registration_schedules_the_first_job() {
    let h = harness();
    seed_operator(&h).await;

    let (equipment, first_job) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();

    let job = first_job.expect("first job should be scheduled");
    assert_eq!(job.equipment_id, equipment.id);
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.due_date, h.clock.today() + Duration::days(90));
    assert_eq!(job.due_usage, 10_000);
}

#[tokio::test]
async fn completion_cascade_schedules_the_successor() {
    let h = harness();
    seed_operator(&h).await;

    let (equipment, first_job) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();
    let job1 = first_job.unwrap();

    let outcome = h
        .services
        .maintenance
        .complete_job(
            job1.id,
            CompleteJob {
                usage: 12_000,
                cost: Some(Decimal::from(500)),
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.job.state, JobState::Completed);
    assert_eq!(outcome.job.completed_usage, Some(12_000));
    assert_eq!(outcome.job.completed_at, Some(h.clock.now()));
    assert_eq!(outcome.job.cost, Some(Decimal::from(500)));

    let refreshed = EquipmentStore::get(h.store.as_ref(), equipment.id)
        .await
        .unwrap();
    assert_eq!(refreshed.current_usage, 12_000);

    let job2 = outcome.successor.expect("successor should be scheduled");
    assert_eq!(job2.state, JobState::Pending);
    assert_eq!(job2.due_date, h.clock.today() + Duration::days(90));
    assert_eq!(job2.due_usage, 22_000);
    assert_eq!(job2.operator_id, job1.operator_id);
}

#[tokio::test]
async fn one_active_job_per_equipment() {
    let h = harness();
    seed_operator(&h).await;

    let (equipment, first_job) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();
    let job1 = first_job.unwrap();

    let err = h
        .services
        .maintenance
        .force_create_job(equipment.id)
        .await
        .unwrap_err();

    match err {
        AppError::DuplicateActiveJob {
            equipment_id,
            conflicting_job_id,
        } => {
            assert_eq!(equipment_id, equipment.id);
            assert_eq!(conflicting_job_id, job1.id);
        }
        other => panic!("expected DuplicateActiveJob, got {:?}", other),
    }
}

#[tokio::test]
async fn completing_with_a_regressed_reading_changes_nothing() {
    let h = harness();
    seed_operator(&h).await;

    let (equipment, first_job) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();
    let job = first_job.unwrap();

    h.store.record_usage(equipment.id, 8_000, false).await.unwrap();

    let err = h
        .services
        .maintenance
        .complete_job(
            job.id,
            CompleteJob {
                usage: 7_500,
                cost: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();

    match err {
        AppError::UsageRegression { supplied, current } => {
            assert_eq!(supplied, 7_500);
            assert_eq!(current, 8_000);
        }
        other => panic!("expected UsageRegression, got {:?}", other),
    }

    let unchanged = h.services.maintenance.get_job(job.id).await.unwrap();
    assert_eq!(unchanged.state, JobState::Pending);
    assert_eq!(unchanged.completed_at, None);
    let refreshed = EquipmentStore::get(h.store.as_ref(), equipment.id)
        .await
        .unwrap();
    assert_eq!(refreshed.current_usage, 8_000);
}

#[tokio::test]
async fn usage_readings_merge_monotonically() {
    let h = harness();
    seed_operator(&h).await;

    let (equipment, _) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();

    h.store.record_usage(equipment.id, 5_000, false).await.unwrap();

    let err = h
        .store
        .record_usage(equipment.id, 4_000, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UsageRegression { .. }));

    // Audited correction path
    let corrected = h.store.record_usage(equipment.id, 4_000, true).await.unwrap();
    assert_eq!(corrected.current_usage, 4_000);

    let raised = h.store.record_usage(equipment.id, 6_000, false).await.unwrap();
    assert_eq!(raised.current_usage, 6_000);
}

#[tokio::test]
async fn overdue_job_escalates_to_every_supervisor() {
    let h = harness();
    seed_operator(&h).await;
    h.store
        .insert_supervisor(&CreateSupervisor {
            name: "Luis Prada".to_string(),
            email: "luis@fleet.test".to_string(),
            phone: None,
        })
        .await
        .unwrap();
    h.store
        .insert_supervisor(&CreateSupervisor {
            name: "Marta Gil".to_string(),
            email: "marta@fleet.test".to_string(),
            phone: None,
        })
        .await
        .unwrap();

    let (_, first_job) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();
    let job = first_job.unwrap();

    // One day past the due date
    h.clock.advance_days(91);

    let summary = h.services.scheduler.tick().await.unwrap();
    assert_eq!(summary.jobs_overdue, 1);
    assert_eq!(summary.anomalies, 0);

    let overdue = h.services.maintenance.get_job(job.id).await.unwrap();
    assert_eq!(overdue.state, JobState::Overdue);

    let escalations = NotificationStore::list(
        h.store.as_ref(),
        &NotificationFilter {
            kind: Some(NotificationKind::Escalation),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(escalations.len(), 2);
    let recipients: HashSet<_> = escalations.iter().map(|n| n.recipient.clone()).collect();
    assert!(recipients.contains("luis@fleet.test"));
    assert!(recipients.contains("marta@fleet.test"));
    for escalation in &escalations {
        assert_eq!(escalation.job_id, Some(job.id));
        assert_eq!(escalation.state, NotificationState::Sent);
    }
}

#[tokio::test]
async fn reminder_fires_on_either_trigger() {
    let h = harness();
    seed_operator(&h).await;

    let (equipment, _) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();

    // 3 days out on the calendar (within 5), 500 km out on usage
    // (beyond 100): the date trigger alone must fire the reminder.
    h.store.record_usage(equipment.id, 9_500, false).await.unwrap();
    h.clock.advance_days(87);

    let created = h
        .services
        .notifier
        .evaluate_and_enqueue(h.clock.now())
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].kind, NotificationKind::Reminder);
    assert_eq!(created[0].recipient, "ana@fleet.test");
}

#[tokio::test]
async fn reminders_are_deduplicated_per_day() {
    let h = harness();
    seed_operator(&h).await;

    h.services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();
    h.clock.advance_days(88);

    let first = h
        .services
        .notifier
        .evaluate_and_enqueue(h.clock.now())
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    let second = h
        .services
        .notifier
        .evaluate_and_enqueue(h.clock.now())
        .await
        .unwrap();
    assert!(second.is_empty());

    // A new calendar day opens a new reminder window
    h.clock.advance_days(1);
    let next_day = h
        .services
        .notifier
        .evaluate_and_enqueue(h.clock.now())
        .await
        .unwrap();
    assert_eq!(next_day.len(), 1);
}

#[tokio::test]
async fn tick_is_idempotent() {
    let h = harness();
    seed_operator(&h).await;

    // Equipment inserted behind the registry's back: the first tick
    // must repair the missing job.
    EquipmentStore::insert(h.store.as_ref(), &new_equipment("ABC-123"))
        .await
        .unwrap();

    let first = h.services.scheduler.tick().await.unwrap();
    assert_eq!(first.jobs_created, 1);

    let second = h.services.scheduler.tick().await.unwrap();
    assert_eq!(second.jobs_created, 0);
    assert_eq!(second.jobs_overdue, 0);
    assert_eq!(second.notifications_enqueued, 0);
    assert_eq!(second.notifications_sent, 0);
    assert_eq!(second.notifications_failed, 0);
    assert_eq!(second.anomalies, 0);
}

#[tokio::test]
async fn delivery_failure_does_not_abort_the_batch() {
    let h = harness();
    seed_operator(&h).await;

    for plate in ["AAA-111", "BBB-222", "CCC-333"] {
        h.services
            .equipment
            .register(new_equipment(plate))
            .await
            .unwrap();
    }
    h.clock.advance_days(88);

    let created = h
        .services
        .notifier
        .evaluate_and_enqueue(h.clock.now())
        .await
        .unwrap();
    assert_eq!(created.len(), 3);

    h.messenger.fail_on_call(2);
    let results = h
        .services
        .notifier
        .flush_pending(h.clock.now())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].sent);
    assert!(!results[1].sent);
    assert!(results[2].sent);
    assert_eq!(
        results[1].error.as_deref(),
        Some("SMTP connection refused")
    );

    let failed = NotificationStore::get(h.store.as_ref(), results[1].notification_id)
        .await
        .unwrap();
    assert_eq!(failed.state, NotificationState::Failed);
    assert_eq!(failed.error.as_deref(), Some("SMTP connection refused"));
    assert_eq!(h.messenger.delivered().len(), 2);
}

#[tokio::test]
async fn failed_notification_can_be_resent() {
    let h = harness();
    seed_operator(&h).await;

    h.services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();
    h.clock.advance_days(88);

    h.services
        .notifier
        .evaluate_and_enqueue(h.clock.now())
        .await
        .unwrap();

    h.messenger.fail_on_call(1);
    let results = h
        .services
        .notifier
        .flush_pending(h.clock.now())
        .await
        .unwrap();
    assert!(!results[0].sent);
    let id = results[0].notification_id;

    // No silent retry: the record stays Failed until an explicit resend
    let resent = h.services.notifier.resend(id).await.unwrap();
    assert!(resent.sent);
    let record = NotificationStore::get(h.store.as_ref(), id).await.unwrap();
    assert_eq!(record.state, NotificationState::Sent);

    // A record that already went out cannot be resent
    let err = h.services.notifier.resend(id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn uncomplete_reports_the_stale_successor() {
    let h = harness();
    seed_operator(&h).await;

    let (_, first_job) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();
    let job1 = first_job.unwrap();

    let outcome = h
        .services
        .maintenance
        .complete_job(
            job1.id,
            CompleteJob {
                usage: 1_000,
                cost: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    let successor = outcome.successor.unwrap();

    let reopened = h
        .services
        .maintenance
        .uncomplete_job(job1.id)
        .await
        .unwrap();

    assert_eq!(reopened.job.completed_at, None);
    assert_eq!(reopened.job.completed_usage, None);
    assert_eq!(reopened.job.state, JobState::Pending);
    assert_eq!(reopened.stale_successor, Some(successor.id));
}

#[tokio::test]
async fn moving_the_due_date_forward_reinstates_an_overdue_job() {
    let h = harness();
    seed_operator(&h).await;

    let (_, first_job) = h
        .services
        .equipment
        .register(new_equipment("ABC-123"))
        .await
        .unwrap();
    let job = first_job.unwrap();

    h.clock.advance_days(95);
    h.services.scheduler.tick().await.unwrap();
    assert_eq!(
        h.services.maintenance.get_job(job.id).await.unwrap().state,
        JobState::Overdue
    );

    let rescheduled = h
        .services
        .maintenance
        .reschedule_job(job.id, h.clock.today() + Duration::days(14))
        .await
        .unwrap();
    assert_eq!(rescheduled.state, JobState::Pending);
}

#[tokio::test]
async fn equipment_without_operators_is_skipped_not_fatal() {
    let h = harness();

    EquipmentStore::insert(h.store.as_ref(), &new_equipment("ABC-123"))
        .await
        .unwrap();

    let summary = h.services.scheduler.tick().await.unwrap();
    assert_eq!(summary.jobs_created, 0);
    assert_eq!(summary.anomalies, 0);

    let jobs = JobStore::list_active(h.store.as_ref()).await.unwrap();
    assert!(jobs.is_empty());
}
