//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{directory, equipment, health, jobs, notifications, scheduler};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Motriz API",
        version = "0.3.0",
        description = "Fleet Maintenance Scheduling REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Motriz maintainers")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::register_equipment,
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::record_usage,
        equipment::due_projection,
        // Jobs
        jobs::list_jobs,
        jobs::get_job,
        jobs::start_job,
        jobs::complete_job,
        jobs::uncomplete_job,
        jobs::reschedule_job,
        jobs::force_create_job,
        jobs::list_maintenance_types,
        jobs::create_maintenance_type,
        // Directory
        directory::list_operators,
        directory::create_operator,
        directory::list_supervisors,
        directory::create_supervisor,
        // Notifications
        notifications::list_notifications,
        notifications::get_notification,
        notifications::resend_notification,
        // Scheduler
        scheduler::run_tick,
    ),
    components(
        schemas(
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::RecordUsage,
            equipment::RegisterResponse,
            crate::services::due::DueProjection,
            crate::services::due::NextDue,
            // Jobs
            crate::models::maintenance::MaintenanceJob,
            crate::models::maintenance::JobState,
            crate::models::maintenance::MaintenanceType,
            crate::models::maintenance::CreateMaintenanceType,
            crate::models::maintenance::CompleteJob,
            jobs::CompleteResponse,
            jobs::UncompleteResponse,
            jobs::RescheduleRequest,
            // Directory
            crate::models::operator::Operator,
            crate::models::operator::Supervisor,
            crate::models::operator::CreateOperator,
            crate::models::operator::CreateSupervisor,
            // Notifications
            crate::models::notification::NotificationRecord,
            crate::models::notification::NotificationKind,
            crate::models::notification::NotificationState,
            crate::models::notification::DeliveryResult,
            // Scheduler
            crate::services::scheduler::TickSummary,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment registry"),
        (name = "jobs", description = "Maintenance job lifecycle"),
        (name = "directory", description = "Operator and supervisor directory"),
        (name = "notifications", description = "Notification ledger"),
        (name = "scheduler", description = "Periodic driver")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
