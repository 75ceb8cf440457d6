//! Motriz Fleet Maintenance Scheduling Server
//!
//! Tracks when each piece of equipment is due for maintenance from two
//! independent triggers (calendar and odometer), runs every job through
//! an explicit lifecycle with automatic overdue detection, and drives
//! reminder/escalation notifications with an idempotent delivery ledger.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
