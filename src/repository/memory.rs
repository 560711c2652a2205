//! In-memory store.
//!
//! All tables live behind one lock, so every mutating call is atomic with
//! respect to concurrent readers. Used by `database.backend = "memory"` and
//! by the test suites.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{EquipmentStore, RequestStore, TeamStore, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
        request::{MaintenanceRequest, NewRequest, RequestChanges, RequestStatus, RequestType, StatusCounts},
        team::{CascadeReport, Team, TeamInput},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct Tables {
    teams: BTreeMap<i32, Team>,
    equipment: BTreeMap<i32, Equipment>,
    requests: BTreeMap<i32, MaintenanceRequest>,
    users: BTreeMap<i32, User>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn request_mut(&mut self, id: i32) -> AppResult<&mut MaintenanceRequest> {
        self.requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))
    }

    fn scrap_equipment(&mut self, equipment_id: i32) {
        if let Some(equipment) = self.equipment.get_mut(&equipment_id) {
            equipment.is_scrapped = true;
        }
    }

    fn serial_taken(&self, serial_no: &str, except: Option<i32>) -> bool {
        self.equipment
            .values()
            .any(|e| e.serial_no == serial_no && Some(e.id) != except)
    }

    /// Remove requests matching `pred`, returning how many went
    fn remove_requests(&mut self, pred: impl Fn(&MaintenanceRequest) -> bool) -> u64 {
        let before = self.requests.len();
        self.requests.retain(|_, r| !pred(r));
        (before - self.requests.len()) as u64
    }
}

/// Store keeping every table in process memory
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TeamStore for InMemoryStore {
    async fn teams_list(&self) -> AppResult<Vec<Team>> {
        let mut teams: Vec<Team> = self.read()?.teams.values().cloned().collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn teams_get(&self, id: i32) -> AppResult<Team> {
        self.read()?
            .teams
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))
    }

    async fn teams_create(&self, data: &TeamInput) -> AppResult<Team> {
        let mut tables = self.write()?;
        let team = Team {
            id: tables.next_id(),
            name: data.name.clone(),
        };
        tables.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn teams_update(&self, id: i32, data: &TeamInput) -> AppResult<Team> {
        let mut tables = self.write()?;
        let team = tables
            .teams
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))?;
        team.name = data.name.clone();
        Ok(team.clone())
    }

    async fn teams_delete(&self, id: i32) -> AppResult<CascadeReport> {
        let mut tables = self.write()?;
        if !tables.teams.contains_key(&id) {
            return Err(AppError::NotFound(format!("Team {} not found", id)));
        }

        let owned: Vec<i32> = tables
            .equipment
            .values()
            .filter(|e| e.team_id == id)
            .map(|e| e.id)
            .collect();

        let requests = tables.remove_requests(|r| r.team_id == id || owned.contains(&r.equipment_id));
        for equipment_id in &owned {
            tables.equipment.remove(equipment_id);
        }
        tables.teams.remove(&id);

        Ok(CascadeReport {
            teams: 1,
            equipment: owned.len() as u64,
            requests,
        })
    }

    async fn teams_count(&self) -> AppResult<i64> {
        Ok(self.read()?.teams.len() as i64)
    }
}

#[async_trait]
impl EquipmentStore for InMemoryStore {
    async fn equipment_list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let tables = self.read()?;
        let mut rows: Vec<Equipment> = tables
            .equipment
            .values()
            .filter(|e| query.team_id.map_or(true, |t| e.team_id == t))
            .filter(|e| query.q.as_deref().map_or(true, |q| e.matches(q)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn equipment_get(&self, id: i32) -> AppResult<Equipment> {
        self.read()?
            .equipment
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn equipment_create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let mut tables = self.write()?;
        if !tables.teams.contains_key(&data.team_id) {
            return Err(AppError::Validation(format!("Team {} does not exist", data.team_id)));
        }
        if tables.serial_taken(&data.serial_no, None) {
            return Err(AppError::Conflict(
                "Equipment with this serial number already exists".to_string(),
            ));
        }

        let equipment = Equipment {
            id: tables.next_id(),
            name: data.name.clone(),
            serial_no: data.serial_no.clone(),
            department: data.department.clone(),
            location: data.location.clone(),
            team_id: data.team_id,
            is_scrapped: false,
        };
        tables.equipment.insert(equipment.id, equipment.clone());
        Ok(equipment)
    }

    async fn equipment_update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tables = self.write()?;
        if let Some(team_id) = data.team_id {
            if !tables.teams.contains_key(&team_id) {
                return Err(AppError::Validation(format!("Team {} does not exist", team_id)));
            }
        }
        if let Some(ref serial_no) = data.serial_no {
            if tables.serial_taken(serial_no, Some(id)) {
                return Err(AppError::Conflict(
                    "Equipment with this serial number already exists".to_string(),
                ));
            }
        }

        let equipment = tables
            .equipment
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;

        if let Some(ref name) = data.name {
            equipment.name = name.clone();
        }
        if let Some(ref serial_no) = data.serial_no {
            equipment.serial_no = serial_no.clone();
        }
        if let Some(ref department) = data.department {
            equipment.department = department.clone();
        }
        if let Some(ref location) = data.location {
            equipment.location = location.clone();
        }
        if let Some(team_id) = data.team_id {
            equipment.team_id = team_id;
        }
        Ok(equipment.clone())
    }

    async fn equipment_delete(&self, id: i32) -> AppResult<CascadeReport> {
        let mut tables = self.write()?;
        if tables.equipment.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        let requests = tables.remove_requests(|r| r.equipment_id == id);
        Ok(CascadeReport { teams: 0, equipment: 1, requests })
    }

    async fn equipment_count(&self) -> AppResult<i64> {
        Ok(self.read()?.equipment.len() as i64)
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn requests_list(&self) -> AppResult<Vec<MaintenanceRequest>> {
        Ok(self.read()?.requests.values().cloned().collect())
    }

    async fn requests_get(&self, id: i32) -> AppResult<MaintenanceRequest> {
        self.read()?
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))
    }

    async fn requests_list_by_type(&self, request_type: RequestType) -> AppResult<Vec<MaintenanceRequest>> {
        let mut rows: Vec<MaintenanceRequest> = self
            .read()?
            .requests
            .values()
            .filter(|r| r.request_type == request_type)
            .cloned()
            .collect();
        // Undated requests last, like NULLS LAST
        rows.sort_by_key(|r| (r.scheduled_date.is_none(), r.scheduled_date, r.id));
        Ok(rows)
    }

    async fn requests_list_overdue(&self, today: NaiveDate) -> AppResult<Vec<MaintenanceRequest>> {
        let mut rows: Vec<MaintenanceRequest> = self
            .read()?
            .requests
            .values()
            .filter(|r| r.is_overdue(today))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.scheduled_date, r.id));
        Ok(rows)
    }

    async fn requests_create(&self, data: &NewRequest) -> AppResult<MaintenanceRequest> {
        let mut tables = self.write()?;
        if !tables.equipment.contains_key(&data.equipment_id) {
            return Err(AppError::Validation(format!("Equipment {} does not exist", data.equipment_id)));
        }
        if !tables.teams.contains_key(&data.team_id) {
            return Err(AppError::Validation(format!("Team {} does not exist", data.team_id)));
        }

        let request = MaintenanceRequest {
            id: tables.next_id(),
            subject: data.subject.clone(),
            equipment_id: data.equipment_id,
            team_id: data.team_id,
            assigned_to: None,
            request_type: data.request_type,
            status: RequestStatus::New,
            scheduled_date: data.scheduled_date,
            duration: data.duration,
            crea_date: Utc::now(),
        };
        tables.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn requests_set_status(&self, id: i32, status: RequestStatus) -> AppResult<MaintenanceRequest> {
        let mut tables = self.write()?;
        let request = tables.request_mut(id)?;
        request.status = status;
        let request = request.clone();

        if status == RequestStatus::Scrap {
            tables.scrap_equipment(request.equipment_id);
        }
        Ok(request)
    }

    async fn requests_update(&self, id: i32, changes: &RequestChanges) -> AppResult<MaintenanceRequest> {
        let mut tables = self.write()?;
        let request = tables.request_mut(id)?;
        request.subject = changes.subject.clone();
        request.request_type = changes.request_type;
        if let Some(status) = changes.status {
            request.status = status;
        }
        let request = request.clone();

        if changes.status == Some(RequestStatus::Scrap) {
            tables.scrap_equipment(request.equipment_id);
        }
        Ok(request)
    }

    async fn requests_assign(&self, id: i32, user_id: Option<i32>) -> AppResult<MaintenanceRequest> {
        let mut tables = self.write()?;
        if let Some(user_id) = user_id {
            if !tables.users.contains_key(&user_id) {
                return Err(AppError::NotFound(format!("User {} not found", user_id)));
            }
        }
        let request = tables.request_mut(id)?;
        request.assigned_to = user_id;
        Ok(request.clone())
    }

    async fn requests_delete(&self, id: i32) -> AppResult<()> {
        self.write()?
            .requests
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))
    }

    async fn requests_count_by_status(&self) -> AppResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for request in self.read()?.requests.values() {
            counts.add(request.status, 1);
        }
        Ok(counts)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn users_list(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn users_get(&self, id: i32) -> AppResult<User> {
        self.read()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn users_get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn users_create(&self, data: &NewUser) -> AppResult<User> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.username == data.username) {
            return Err(AppError::Conflict(format!("Username {} already exists", data.username)));
        }

        let user = User {
            id: tables.next_id(),
            username: data.username.clone(),
            name: data.name.clone(),
            email: data.email.clone(),
            password: data.password_hash.clone(),
            roles: data.roles.clone(),
            crea_date: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn users_delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.write()?;
        if tables.users.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        for request in tables.requests.values_mut() {
            if request.assigned_to == Some(id) {
                request.assigned_to = None;
            }
        }
        Ok(())
    }

    async fn users_count(&self) -> AppResult<i64> {
        Ok(self.read()?.users.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(store: &InMemoryStore) -> (Team, Equipment) {
        let team = store
            .teams_create(&TeamInput { name: "Mechanics".into() })
            .await
            .unwrap();
        let equipment = store
            .equipment_create(&CreateEquipment {
                name: "Pump".into(),
                serial_no: "P-001".into(),
                department: "Plant".into(),
                location: "Hall A".into(),
                team_id: team.id,
            })
            .await
            .unwrap();
        (team, equipment)
    }

    fn new_request(subject: &str, equipment_id: i32, team_id: i32, request_type: RequestType) -> NewRequest {
        NewRequest {
            subject: subject.into(),
            equipment_id,
            team_id,
            request_type,
            scheduled_date: None,
            duration: None,
        }
    }

    #[tokio::test]
    async fn scrap_status_marks_equipment() {
        let store = InMemoryStore::new();
        let (team, equipment) = seed(&store).await;
        let request = store
            .requests_create(&new_request("Pump leak", equipment.id, team.id, RequestType::Corrective))
            .await
            .unwrap();

        store.requests_set_status(request.id, RequestStatus::Scrap).await.unwrap();

        assert!(store.equipment_get(equipment.id).await.unwrap().is_scrapped);
        assert_eq!(store.requests_get(request.id).await.unwrap().status, RequestStatus::Scrap);
    }

    #[tokio::test]
    async fn reopening_scrap_keeps_equipment_scrapped() {
        let store = InMemoryStore::new();
        let (team, equipment) = seed(&store).await;
        let request = store
            .requests_create(&new_request("Pump leak", equipment.id, team.id, RequestType::Corrective))
            .await
            .unwrap();

        store.requests_set_status(request.id, RequestStatus::Scrap).await.unwrap();
        store.requests_set_status(request.id, RequestStatus::New).await.unwrap();

        assert!(store.equipment_get(equipment.id).await.unwrap().is_scrapped);
    }

    #[tokio::test]
    async fn set_status_on_missing_request_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.requests_set_status(42, RequestStatus::Scrap).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_rejects_dangling_references() {
        let store = InMemoryStore::new();
        let (team, equipment) = seed(&store).await;

        let err = store
            .requests_create(&new_request("x", 999, team.id, RequestType::Corrective))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = store
            .requests_create(&new_request("x", equipment.id, 999, RequestType::Corrective))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.requests_count_by_status().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn team_delete_cascades_to_equipment_and_requests() {
        let store = InMemoryStore::new();
        let (team, equipment) = seed(&store).await;
        let (other_team, other_equipment) = {
            let t = store.teams_create(&TeamInput { name: "Electrics".into() }).await.unwrap();
            let e = store
                .equipment_create(&CreateEquipment {
                    name: "Panel".into(),
                    serial_no: "E-001".into(),
                    department: String::new(),
                    location: String::new(),
                    team_id: t.id,
                })
                .await
                .unwrap();
            (t, e)
        };

        // Owned equipment, handled by another team
        store
            .requests_create(&new_request("a", equipment.id, other_team.id, RequestType::Corrective))
            .await
            .unwrap();
        // Other equipment, handled by the deleted team
        store
            .requests_create(&new_request("b", other_equipment.id, team.id, RequestType::Corrective))
            .await
            .unwrap();
        // Unrelated
        let survivor = store
            .requests_create(&new_request("c", other_equipment.id, other_team.id, RequestType::Preventive))
            .await
            .unwrap();

        let report = store.teams_delete(team.id).await.unwrap();

        assert_eq!(report, CascadeReport { teams: 1, equipment: 1, requests: 2 });
        assert!(store.equipment_get(equipment.id).await.is_err());
        let remaining = store.requests_list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, survivor.id);
    }

    #[tokio::test]
    async fn equipment_delete_cascades_to_requests() {
        let store = InMemoryStore::new();
        let (team, equipment) = seed(&store).await;
        store
            .requests_create(&new_request("a", equipment.id, team.id, RequestType::Corrective))
            .await
            .unwrap();

        let report = store.equipment_delete(equipment.id).await.unwrap();
        assert_eq!(report.requests, 1);
        assert!(store.requests_list().await.unwrap().is_empty());
        assert_eq!(store.teams_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_serial_is_conflict() {
        let store = InMemoryStore::new();
        let (team, _) = seed(&store).await;
        let err = store
            .equipment_create(&CreateEquipment {
                name: "Second pump".into(),
                serial_no: "P-001".into(),
                department: String::new(),
                location: String::new(),
                team_id: team.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn user_delete_clears_assignments() {
        let store = InMemoryStore::new();
        let (team, equipment) = seed(&store).await;
        let user = store
            .users_create(&NewUser {
                username: "tech".into(),
                name: "Tech".into(),
                email: None,
                password_hash: "x".into(),
                roles: vec![],
            })
            .await
            .unwrap();
        let request = store
            .requests_create(&new_request("a", equipment.id, team.id, RequestType::Corrective))
            .await
            .unwrap();
        store.requests_assign(request.id, Some(user.id)).await.unwrap();

        store.users_delete(user.id).await.unwrap();

        assert_eq!(store.requests_get(request.id).await.unwrap().assigned_to, None);
    }

    #[tokio::test]
    async fn search_matches_name_or_serial() {
        let store = InMemoryStore::new();
        seed(&store).await;
        let by_serial = store
            .equipment_list(&EquipmentQuery { team_id: None, q: Some("p-0".into()) })
            .await
            .unwrap();
        assert_eq!(by_serial.len(), 1);
        let none = store
            .equipment_list(&EquipmentQuery { team_id: None, q: Some("lathe".into()) })
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
