//! Business logic services

pub mod clock;
pub mod due;
pub mod equipment;
pub mod maintenance;
pub mod messenger;
pub mod notifier;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{AppConfig, MaintenancePolicy, NotificationChannel},
    error::{AppError, AppResult},
    repository::{DirectoryStore, EquipmentStore, JobStore, NotificationStore, Repository},
};
use clock::{Clock, SystemClock};
use due::DueCalculator;
use equipment::EquipmentService;
use maintenance::MaintenanceService;
use messenger::{Messenger, SmtpMessenger, WhatsAppMessenger};
use notifier::NotifierService;
use scheduler::SchedulerService;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: EquipmentService,
    pub maintenance: MaintenanceService,
    pub notifier: NotifierService,
    pub scheduler: Arc<SchedulerService>,
    pub directory: Arc<dyn DirectoryStore>,
}

impl Services {
    /// Wire all services against the Postgres repositories
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.notifications.send_timeout_secs);
        let messenger: Arc<dyn Messenger> = match config.notifications.channel {
            NotificationChannel::Email => {
                Arc::new(SmtpMessenger::new(config.email.clone(), timeout))
            }
            NotificationChannel::Whatsapp => {
                let whatsapp = config.whatsapp.clone().ok_or_else(|| {
                    AppError::Internal(
                        "whatsapp channel selected but [whatsapp] is not configured".to_string(),
                    )
                })?;
                Arc::new(WhatsAppMessenger::new(whatsapp, timeout))
            }
        };

        Ok(Self::with_stores(
            Arc::new(repository.equipment.clone()),
            Arc::new(repository.jobs.clone()),
            Arc::new(repository.notifications.clone()),
            Arc::new(repository.directory.clone()),
            messenger,
            config.maintenance,
            config.notifications.channel,
            Arc::new(SystemClock),
        ))
    }

    /// Wire all services against explicit store and collaborator
    /// implementations; tests use this with the in-memory store, a
    /// manual clock and a scripted messenger.
    #[allow(clippy::too_many_arguments)]
    pub fn with_stores(
        equipment: Arc<dyn EquipmentStore>,
        jobs: Arc<dyn JobStore>,
        notifications: Arc<dyn NotificationStore>,
        directory: Arc<dyn DirectoryStore>,
        messenger: Arc<dyn Messenger>,
        policy: MaintenancePolicy,
        channel: NotificationChannel,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let calculator = DueCalculator::new(policy);
        let maintenance = MaintenanceService::new(
            jobs.clone(),
            equipment.clone(),
            directory.clone(),
            calculator,
            clock.clone(),
        );
        let equipment_service = EquipmentService::new(
            equipment.clone(),
            jobs.clone(),
            maintenance.clone(),
            calculator,
            clock.clone(),
        );
        let notifier = NotifierService::new(
            notifications,
            jobs.clone(),
            equipment.clone(),
            directory.clone(),
            messenger,
            calculator,
            channel,
            clock.clone(),
        );
        let scheduler = Arc::new(SchedulerService::new(
            equipment,
            jobs,
            maintenance.clone(),
            notifier.clone(),
            clock,
        ));

        Self {
            equipment: equipment_service,
            maintenance,
            notifier,
            scheduler,
            directory,
        }
    }
}
