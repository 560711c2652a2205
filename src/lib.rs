//! GearGuard Maintenance Tracker
//!
//! Tracks equipment, the maintenance teams that own it, and maintenance
//! requests moving through New, In Progress, Repaired and Scrap. Serves the
//! kanban board, calendar and dashboard views plus a REST JSON API.

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

impl AppState {
    pub fn new(config: AppConfig, store: services::SharedStore) -> Self {
        let services = services::Services::new(store, config.auth.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
