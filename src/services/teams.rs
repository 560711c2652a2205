//! Team directory service

use validator::Validate;

use super::SharedStore;
use crate::{
    error::AppResult,
    models::team::{CascadeReport, Team, TeamInput},
    repository::TeamStore,
};

#[derive(Clone)]
pub struct TeamsService {
    store: SharedStore,
}

impl TeamsService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<Team>> {
        self.store.teams_list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Team> {
        self.store.teams_get(id).await
    }

    pub async fn create(&self, data: &TeamInput) -> AppResult<Team> {
        data.validate()?;
        let team = self.store.teams_create(data).await?;
        tracing::info!(team_id = team.id, "Team created");
        Ok(team)
    }

    pub async fn rename(&self, id: i32, data: &TeamInput) -> AppResult<Team> {
        data.validate()?;
        self.store.teams_update(id, data).await
    }

    /// Delete a team with everything that references it
    pub async fn delete(&self, id: i32) -> AppResult<CascadeReport> {
        let report = self.store.teams_delete(id).await?;
        tracing::info!(
            team_id = id,
            equipment = report.equipment,
            requests = report.requests,
            "Team deleted"
        );
        Ok(report)
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.store.teams_count().await
    }
}
