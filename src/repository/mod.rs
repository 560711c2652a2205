//! Repository layer for database operations
//!
//! The store traits are implemented twice: by [`Repository`] on PostgreSQL and
//! by [`memory::InMemoryStore`]. Every mutating method is atomic: it either
//! applies all of its effects (status change and equipment scrap, cascading
//! deletes, assignment clearing) or none of them.

pub mod equipment;
pub mod memory;
pub mod requests;
pub mod teams;
pub mod users;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
        request::{MaintenanceRequest, NewRequest, RequestChanges, RequestStatus, RequestType, StatusCounts},
        team::{CascadeReport, Team, TeamInput},
        user::{NewUser, User},
    },
};

pub use memory::InMemoryStore;

/// Team directory storage
#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn teams_list(&self) -> AppResult<Vec<Team>>;
    async fn teams_get(&self, id: i32) -> AppResult<Team>;
    async fn teams_create(&self, data: &TeamInput) -> AppResult<Team>;
    async fn teams_update(&self, id: i32, data: &TeamInput) -> AppResult<Team>;
    /// Delete a team, its equipment, and every request referencing either
    async fn teams_delete(&self, id: i32) -> AppResult<CascadeReport>;
    async fn teams_count(&self) -> AppResult<i64>;
}

/// Equipment registry storage
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    async fn equipment_list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>>;
    async fn equipment_get(&self, id: i32) -> AppResult<Equipment>;
    async fn equipment_create(&self, data: &CreateEquipment) -> AppResult<Equipment>;
    async fn equipment_update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment>;
    /// Delete equipment and every request referencing it
    async fn equipment_delete(&self, id: i32) -> AppResult<CascadeReport>;
    async fn equipment_count(&self) -> AppResult<i64>;
}

/// Maintenance request storage
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn requests_list(&self) -> AppResult<Vec<MaintenanceRequest>>;
    async fn requests_get(&self, id: i32) -> AppResult<MaintenanceRequest>;
    async fn requests_list_by_type(&self, request_type: RequestType) -> AppResult<Vec<MaintenanceRequest>>;
    /// Open requests scheduled before `today`, earliest first
    async fn requests_list_overdue(&self, today: NaiveDate) -> AppResult<Vec<MaintenanceRequest>>;
    /// Insert with status New; unknown equipment or team is a validation error
    async fn requests_create(&self, data: &NewRequest) -> AppResult<MaintenanceRequest>;
    /// Set status; Scrap also marks the linked equipment scrapped
    async fn requests_set_status(&self, id: i32, status: RequestStatus) -> AppResult<MaintenanceRequest>;
    /// Apply edits; a status change to Scrap also marks the linked equipment scrapped
    async fn requests_update(&self, id: i32, changes: &RequestChanges) -> AppResult<MaintenanceRequest>;
    async fn requests_assign(&self, id: i32, user_id: Option<i32>) -> AppResult<MaintenanceRequest>;
    async fn requests_delete(&self, id: i32) -> AppResult<()>;
    async fn requests_count_by_status(&self) -> AppResult<StatusCounts>;
}

/// User directory storage
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn users_list(&self) -> AppResult<Vec<User>>;
    async fn users_get(&self, id: i32) -> AppResult<User>;
    async fn users_get_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn users_create(&self, data: &NewUser) -> AppResult<User>;
    /// Delete a user and clear their request assignments
    async fn users_delete(&self, id: i32) -> AppResult<()>;
    async fn users_count(&self) -> AppResult<i64>;
}

/// Everything the services need from a storage backend
pub trait MaintenanceStore: TeamStore + EquipmentStore + RequestStore + UserStore {}

impl<T> MaintenanceStore for T where T: TeamStore + EquipmentStore + RequestStore + UserStore {}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}
