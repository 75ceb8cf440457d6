//! Motriz Server - Fleet Maintenance Scheduling
//!
//! A Rust REST API server that schedules fleet maintenance and drives
//! the reminder/escalation notification pipeline.

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use motriz_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("motriz_server={},tower_http=debug", config.logging.level).into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Motriz Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, &config).expect("Failed to create services");

    // Create application state
    let state = AppState {
        services: Arc::new(services),
        config: Arc::new(config),
    };

    // Start the periodic maintenance driver
    if state.config.scheduler.enabled {
        let scheduler = state.services.scheduler.clone();
        let every = Duration::from_secs(state.config.scheduler.tick_interval_secs);
        tracing::info!(interval_secs = every.as_secs(), "maintenance scheduler started");
        tokio::spawn(scheduler.run(every));
    }

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Equipment
        .route("/equipment", get(api::equipment::list_equipment))
        .route("/equipment", post(api::equipment::register_equipment))
        .route("/equipment/:id", get(api::equipment::get_equipment))
        .route("/equipment/:id/usage", post(api::equipment::record_usage))
        .route("/equipment/:id/due", get(api::equipment::due_projection))
        .route("/equipment/:id/jobs", post(api::jobs::force_create_job))
        // Maintenance jobs
        .route("/jobs", get(api::jobs::list_jobs))
        .route("/jobs/:id", get(api::jobs::get_job))
        .route("/jobs/:id/start", post(api::jobs::start_job))
        .route("/jobs/:id/complete", post(api::jobs::complete_job))
        .route("/jobs/:id/uncomplete", post(api::jobs::uncomplete_job))
        .route("/jobs/:id/due-date", put(api::jobs::reschedule_job))
        .route("/maintenance-types", get(api::jobs::list_maintenance_types))
        .route("/maintenance-types", post(api::jobs::create_maintenance_type))
        // Directory
        .route("/operators", get(api::directory::list_operators))
        .route("/operators", post(api::directory::create_operator))
        .route("/supervisors", get(api::directory::list_supervisors))
        .route("/supervisors", post(api::directory::create_supervisor))
        // Notifications
        .route("/notifications", get(api::notifications::list_notifications))
        .route("/notifications/:id", get(api::notifications::get_notification))
        .route(
            "/notifications/:id/resend",
            post(api::notifications::resend_notification),
        )
        // Scheduler
        .route("/scheduler/tick", post(api::scheduler::run_tick))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
