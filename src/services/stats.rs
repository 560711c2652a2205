//! Dashboard statistics and per-team / per-equipment reports

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use super::SharedStore;
use crate::{
    error::AppResult,
    models::{
        equipment::EquipmentQuery,
        request::{MaintenanceRequest, RequestStatus},
    },
    repository::{EquipmentStore, RequestStore, TeamStore},
};

/// Dashboard counters
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_requests: i64,
    pub new: i64,
    pub in_progress: i64,
    pub repaired: i64,
    pub scrap: i64,
    pub equipment: i64,
    pub teams: i64,
}

/// Requests handled by one team
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TeamReport {
    pub team_id: i32,
    pub team_name: String,
    pub total_requests: i64,
    /// Requests in the Repaired stage
    pub completed_requests: i64,
    pub in_progress: i64,
    /// Completed share in percent; absent when the team has no requests
    pub completion_rate: Option<f64>,
}

/// Requests raised against one piece of equipment
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EquipmentReport {
    pub equipment_id: i32,
    pub equipment_name: String,
    pub total_requests: i64,
    pub completed_requests: i64,
    pub overdue_requests: i64,
    pub completion_rate: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: i64,
    completed: i64,
    in_progress: i64,
    overdue: i64,
}

impl Tally {
    fn add(&mut self, request: &MaintenanceRequest, today: NaiveDate) {
        self.total += 1;
        match request.status {
            RequestStatus::Repaired => self.completed += 1,
            RequestStatus::InProgress => self.in_progress += 1,
            _ => {}
        }
        if request.is_overdue(today) {
            self.overdue += 1;
        }
    }

    fn completion_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.completed as f64 * 10000.0 / self.total as f64).round() / 100.0)
    }
}

fn tally_by<F>(requests: &[MaintenanceRequest], today: NaiveDate, key: F) -> HashMap<i32, Tally>
where
    F: Fn(&MaintenanceRequest) -> i32,
{
    let mut tallies: HashMap<i32, Tally> = HashMap::new();
    for request in requests {
        tallies.entry(key(request)).or_default().add(request, today);
    }
    tallies
}

#[derive(Clone)]
pub struct StatsService {
    store: SharedStore,
}

impl StatsService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let counts = self.store.requests_count_by_status().await?;
        Ok(DashboardStats {
            total_requests: counts.total(),
            new: counts.new,
            in_progress: counts.in_progress,
            repaired: counts.repaired,
            scrap: counts.scrap,
            equipment: self.store.equipment_count().await?,
            teams: self.store.teams_count().await?,
        })
    }

    /// One row per team, busiest first
    pub async fn team_report(&self, today: NaiveDate) -> AppResult<Vec<TeamReport>> {
        let requests = self.store.requests_list().await?;
        let tallies = tally_by(&requests, today, |r| r.team_id);

        let mut rows: Vec<TeamReport> = self
            .store
            .teams_list()
            .await?
            .into_iter()
            .map(|team| {
                let tally = tallies.get(&team.id).copied().unwrap_or_default();
                TeamReport {
                    team_id: team.id,
                    team_name: team.name,
                    total_requests: tally.total,
                    completed_requests: tally.completed,
                    in_progress: tally.in_progress,
                    completion_rate: tally.completion_rate(),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.total_requests.cmp(&a.total_requests).then(a.team_id.cmp(&b.team_id)));
        Ok(rows)
    }

    /// One row per piece of equipment, scrapped included, busiest first
    pub async fn equipment_report(&self, today: NaiveDate) -> AppResult<Vec<EquipmentReport>> {
        let requests = self.store.requests_list().await?;
        let tallies = tally_by(&requests, today, |r| r.equipment_id);

        let mut rows: Vec<EquipmentReport> = self
            .store
            .equipment_list(&EquipmentQuery::default())
            .await?
            .into_iter()
            .map(|equipment| {
                let tally = tallies.get(&equipment.id).copied().unwrap_or_default();
                EquipmentReport {
                    equipment_id: equipment.id,
                    equipment_name: equipment.name,
                    total_requests: tally.total,
                    completed_requests: tally.completed,
                    overdue_requests: tally.overdue,
                    completion_rate: tally.completion_rate(),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.total_requests
                .cmp(&a.total_requests)
                .then(a.equipment_id.cmp(&b.equipment_id))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        models::{
            equipment::CreateEquipment,
            request::{NewRequest, RequestType},
            team::TeamInput,
        },
        repository::InMemoryStore,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    async fn seeded() -> (StatsService, Vec<i32>, Vec<i32>) {
        let store = Arc::new(InMemoryStore::new());
        let busy = store.teams_create(&TeamInput { name: "Mechanics".into() }).await.unwrap();
        let idle = store.teams_create(&TeamInput { name: "Electricians".into() }).await.unwrap();
        let press = store
            .equipment_create(&CreateEquipment {
                name: "Press".into(),
                serial_no: "P-1".into(),
                department: "Production".into(),
                location: "Line 1".into(),
                team_id: busy.id,
            })
            .await
            .unwrap();
        let lathe = store
            .equipment_create(&CreateEquipment {
                name: "Lathe".into(),
                serial_no: "L-1".into(),
                department: "Production".into(),
                location: "Line 2".into(),
                team_id: idle.id,
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for scheduled_date in [None, None, NaiveDate::from_ymd_opt(2026, 1, 10)] {
            let request = store
                .requests_create(&NewRequest {
                    subject: "Press jam".into(),
                    equipment_id: press.id,
                    team_id: busy.id,
                    request_type: RequestType::Corrective,
                    scheduled_date,
                    duration: None,
                })
                .await
                .unwrap();
            ids.push(request.id);
        }
        store.requests_set_status(ids[0], RequestStatus::Repaired).await.unwrap();
        store.requests_set_status(ids[1], RequestStatus::InProgress).await.unwrap();

        (StatsService::new(store), vec![busy.id, idle.id], vec![press.id, lathe.id])
    }

    #[tokio::test]
    async fn team_report_counts_per_handling_team() {
        let (stats, teams, _) = seeded().await;

        let rows = stats.team_report(today()).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team_id, teams[0]);
        assert_eq!(rows[0].total_requests, 3);
        assert_eq!(rows[0].completed_requests, 1);
        assert_eq!(rows[0].in_progress, 1);
        assert_eq!(rows[0].completion_rate, Some(33.33));
        assert_eq!(rows[1].team_id, teams[1]);
        assert_eq!(rows[1].total_requests, 0);
        assert_eq!(rows[1].completion_rate, None);
    }

    #[tokio::test]
    async fn equipment_report_includes_idle_equipment() {
        let (stats, _, equipment) = seeded().await;

        let rows = stats.equipment_report(today()).await.unwrap();

        assert_eq!(rows[0].equipment_id, equipment[0]);
        assert_eq!(rows[0].total_requests, 3);
        assert_eq!(rows[0].overdue_requests, 1);
        assert_eq!(rows[1].equipment_id, equipment[1]);
        assert_eq!(rows[1].total_requests, 0);
        assert_eq!(rows[1].overdue_requests, 0);
    }
}
