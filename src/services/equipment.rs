//! Equipment service

use validator::Validate;

use super::SharedStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
        team::CascadeReport,
    },
    repository::EquipmentStore,
};

#[derive(Clone)]
pub struct EquipmentService {
    store: SharedStore,
}

impl EquipmentService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        if let Some(q) = query.q.as_deref() {
            if q.trim().chars().count() < 2 {
                return Err(AppError::Validation(
                    "Search query must be at least 2 characters".to_string(),
                ));
            }
        }
        self.store.equipment_list(query).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<Equipment>> {
        self.store.equipment_list(&EquipmentQuery::default()).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.store.equipment_get(id).await
    }

    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        let equipment = self.store.equipment_create(data).await?;
        tracing::info!(equipment_id = equipment.id, team_id = equipment.team_id, "Equipment registered");
        Ok(equipment)
    }

    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        self.store.equipment_update(id, data).await
    }

    /// Delete equipment together with its requests
    pub async fn delete(&self, id: i32) -> AppResult<CascadeReport> {
        let report = self.store.equipment_delete(id).await?;
        tracing::info!(equipment_id = id, requests = report.requests, "Equipment deleted");
        Ok(report)
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.store.equipment_count().await
    }
}
