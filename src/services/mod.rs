//! Business logic services

pub mod equipment;
pub mod requests;
pub mod stats;
pub mod teams;
pub mod users;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::MaintenanceStore};

/// Storage backend shared by every service
pub type SharedStore = Arc<dyn MaintenanceStore>;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub teams: teams::TeamsService,
    pub equipment: equipment::EquipmentService,
    pub requests: requests::RequestsService,
    pub users: users::UsersService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: SharedStore, auth_config: AuthConfig) -> Self {
        Self {
            teams: teams::TeamsService::new(store.clone()),
            equipment: equipment::EquipmentService::new(store.clone()),
            requests: requests::RequestsService::new(store.clone()),
            users: users::UsersService::new(store.clone(), auth_config),
            stats: stats::StatsService::new(store),
        }
    }
}
