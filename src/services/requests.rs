//! Request lifecycle service
//!
//! Owns every status transition. Gated operations take the acting user's
//! claims (`None` for anonymous callers) and consult the access policy before
//! touching the store. The scrap side effect itself is applied by the store in
//! the same transaction as the status change.

use chrono::NaiveDate;

use super::SharedStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        request::{
            BoardStage, MaintenanceRequest, NewRequest, RequestChanges, RequestFilter, RequestStatus,
            RequestType, StatusCounts,
        },
        user::{is_privileged, require_privileged, UserClaims},
    },
    repository::RequestStore,
};

pub const STATUS_FORBIDDEN: &str = "Only maintenance team can do this";
pub const DELETE_FORBIDDEN: &str = "You are not allowed to delete requests";

const SUBJECT_MAX_CHARS: usize = 200;

/// Trimmed subject, rejected when empty or longer than the column allows
fn normalize_subject(subject: &str) -> AppResult<String> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(AppError::Validation("subject is required".to_string()));
    }
    if subject.chars().count() > SUBJECT_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "subject must be at most {} characters",
            SUBJECT_MAX_CHARS
        )));
    }
    Ok(subject.to_string())
}

/// Caller-supplied edits for `update_request`
#[derive(Debug, Clone)]
pub struct RequestEdit {
    pub subject: String,
    pub request_type: RequestType,
    /// Only honoured for privileged actors
    pub status: Option<RequestStatus>,
}

#[derive(Clone)]
pub struct RequestsService {
    store: SharedStore,
}

impl RequestsService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: i32) -> AppResult<MaintenanceRequest> {
        self.store.requests_get(id).await
    }

    /// Requests grouped under the four fixed stages
    pub async fn board(&self) -> AppResult<Vec<BoardStage>> {
        let requests = self.store.requests_list().await?;
        let stages = RequestStatus::ALL
            .iter()
            .map(|&status| BoardStage {
                status,
                requests: requests.iter().filter(|r| r.status == status).cloned().collect(),
            })
            .collect();
        Ok(stages)
    }

    pub async fn filter_by_type(&self, request_type: RequestType) -> AppResult<Vec<MaintenanceRequest>> {
        self.store.requests_list_by_type(request_type).await
    }

    /// Requests matching every criterion set in `filter`, newest first
    pub async fn search(&self, filter: &RequestFilter, today: NaiveDate) -> AppResult<Vec<MaintenanceRequest>> {
        let mut requests: Vec<_> = self
            .store
            .requests_list()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r, today))
            .collect();
        requests.sort_by(|a, b| b.crea_date.cmp(&a.crea_date).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    /// Preventive requests, for the calendar view
    pub async fn calendar(&self) -> AppResult<Vec<MaintenanceRequest>> {
        self.filter_by_type(RequestType::Preventive).await
    }

    pub async fn list_overdue(&self, today: NaiveDate) -> AppResult<Vec<MaintenanceRequest>> {
        self.store.requests_list_overdue(today).await
    }

    pub async fn count_by_status(&self) -> AppResult<StatusCounts> {
        self.store.requests_count_by_status().await
    }

    /// Create a request; any caller may do this and status always starts at New
    pub async fn create(&self, data: NewRequest) -> AppResult<MaintenanceRequest> {
        let subject = normalize_subject(&data.subject)?;

        let request = self
            .store
            .requests_create(&NewRequest { subject, ..data })
            .await?;
        tracing::info!(
            request_id = request.id,
            equipment_id = request.equipment_id,
            team_id = request.team_id,
            "Created {} request",
            request.request_type
        );
        Ok(request)
    }

    /// Set a request's status; Scrap also scraps the linked equipment
    pub async fn set_status(
        &self,
        id: i32,
        status: RequestStatus,
        actor: Option<&UserClaims>,
    ) -> AppResult<MaintenanceRequest> {
        self.store.requests_get(id).await?;
        require_privileged(actor, STATUS_FORBIDDEN)?;

        let request = self.store.requests_set_status(id, status).await?;
        tracing::info!(request_id = id, "Request status set to {}", status);
        Ok(request)
    }

    /// Overwrite subject and type; status only changes for privileged actors
    pub async fn update(
        &self,
        id: i32,
        edit: RequestEdit,
        actor: Option<&UserClaims>,
    ) -> AppResult<MaintenanceRequest> {
        self.store.requests_get(id).await?;
        let subject = normalize_subject(&edit.subject)?;

        let status = match edit.status {
            Some(status) if is_privileged(actor) => Some(status),
            Some(status) => {
                tracing::debug!(request_id = id, "Ignoring status {} from non-privileged user", status);
                None
            }
            None => None,
        };

        let request = self
            .store
            .requests_update(
                id,
                &RequestChanges {
                    subject,
                    request_type: edit.request_type,
                    status,
                },
            )
            .await?;
        tracing::info!(request_id = id, status = %request.status, "Request updated");
        Ok(request)
    }

    /// Assign the request to a user, or clear the assignment
    pub async fn assign(&self, id: i32, user_id: Option<i32>) -> AppResult<MaintenanceRequest> {
        let request = self.store.requests_assign(id, user_id).await?;
        tracing::info!(request_id = id, assigned_to = ?user_id, "Request assignment changed");
        Ok(request)
    }

    pub async fn delete(&self, id: i32, actor: Option<&UserClaims>) -> AppResult<()> {
        require_privileged(actor, DELETE_FORBIDDEN)?;
        self.store.requests_delete(id).await?;
        tracing::info!(request_id = id, "Request deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::{
        models::{
            equipment::CreateEquipment,
            team::TeamInput,
            user::Role,
        },
        repository::{EquipmentStore, InMemoryStore, TeamStore},
    };

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: RequestsService,
        team_id: i32,
        equipment_id: i32,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let team = store.teams_create(&TeamInput { name: "T1".into() }).await.unwrap();
        let equipment = store
            .equipment_create(&CreateEquipment {
                name: "E1".into(),
                serial_no: "SN-1".into(),
                department: "Production".into(),
                location: "Line 1".into(),
                team_id: team.id,
            })
            .await
            .unwrap();
        Fixture {
            service: RequestsService::new(store.clone()),
            store,
            team_id: team.id,
            equipment_id: equipment.id,
        }
    }

    fn claims(roles: Vec<Role>) -> UserClaims {
        UserClaims {
            sub: "user".into(),
            user_id: 7,
            roles,
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        }
    }

    impl Fixture {
        async fn create(&self, subject: &str, request_type: RequestType) -> MaintenanceRequest {
            self.service
                .create(NewRequest {
                    subject: subject.into(),
                    equipment_id: self.equipment_id,
                    team_id: self.team_id,
                    request_type,
                    scheduled_date: None,
                    duration: None,
                })
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn create_starts_new_and_increments_total() {
        let f = fixture().await;
        let before = f.service.count_by_status().await.unwrap().total();

        let request = f.create("Pump leak", RequestType::Corrective).await;

        assert_eq!(request.status, RequestStatus::New);
        assert_eq!(f.service.count_by_status().await.unwrap().total(), before + 1);
    }

    #[tokio::test]
    async fn create_requires_subject() {
        let f = fixture().await;
        let result = f
            .service
            .create(NewRequest {
                subject: "   ".into(),
                equipment_id: f.equipment_id,
                team_id: f.team_id,
                request_type: RequestType::Corrective,
                scheduled_date: None,
                duration: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn update_rejects_overlong_subject() {
        let f = fixture().await;
        let request = f.create("Pump leak", RequestType::Corrective).await;
        let tech = claims(vec![Role::MaintenanceTeam]);

        let err = f
            .service
            .update(
                request.id,
                RequestEdit {
                    subject: "x".repeat(250),
                    request_type: RequestType::Corrective,
                    status: None,
                },
                Some(&tech),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "subject must be at most 200 characters"));
        assert_eq!(f.service.get(request.id).await.unwrap().subject, "Pump leak");
    }

    #[test]
    fn subject_is_trimmed_and_bounded() {
        assert_eq!(normalize_subject("  Pump leak ").unwrap(), "Pump leak");
        assert_ok!(normalize_subject(&"é".repeat(200)));
        assert_err!(normalize_subject(&"é".repeat(201)));
        assert_err!(normalize_subject("\t"));
    }

    #[tokio::test]
    async fn search_combines_filters() {
        let f = fixture().await;
        let tech = claims(vec![Role::MaintenanceTeam]);
        let other_team = f.store.teams_create(&TeamInput { name: "T2".into() }).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

        let open = f.create("open", RequestType::Corrective).await;
        let repaired = f.create("repaired", RequestType::Corrective).await;
        f.service.set_status(repaired.id, RequestStatus::Repaired, Some(&tech)).await.unwrap();
        let elsewhere = f
            .service
            .create(NewRequest {
                subject: "late".into(),
                equipment_id: f.equipment_id,
                team_id: other_team.id,
                request_type: RequestType::Preventive,
                scheduled_date: NaiveDate::from_ymd_opt(2026, 1, 5),
                duration: None,
            })
            .await
            .unwrap();

        let by_status = RequestFilter { status: Some(RequestStatus::New), ..Default::default() };
        let ids: Vec<_> = f.service.search(&by_status, today).await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![elsewhere.id, open.id]);

        let by_team = RequestFilter { team_id: Some(f.team_id), ..Default::default() };
        assert_eq!(f.service.search(&by_team, today).await.unwrap().len(), 2);

        let overdue = RequestFilter { overdue: Some(true), ..Default::default() };
        let found = f.service.search(&overdue, today).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, elsewhere.id);

        let none = RequestFilter {
            team_id: Some(f.team_id),
            request_type: Some(RequestType::Preventive),
            ..Default::default()
        };
        assert!(f.service.search(&none, today).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn privileged_scrap_marks_equipment() {
        let f = fixture().await;
        let request = f.create("Pump leak", RequestType::Corrective).await;
        let tech = claims(vec![Role::MaintenanceTeam]);

        let updated = f
            .service
            .set_status(request.id, RequestStatus::Scrap, Some(&tech))
            .await
            .unwrap();

        assert_eq!(updated.status, RequestStatus::Scrap);
        assert!(f.store.equipment_get(f.equipment_id).await.unwrap().is_scrapped);
    }

    #[tokio::test]
    async fn non_privileged_set_status_is_forbidden_and_unchanged() {
        let f = fixture().await;
        let request = f.create("Pump leak", RequestType::Corrective).await;
        let employee = claims(vec![Role::Employee]);

        let err = f
            .service
            .set_status(request.id, RequestStatus::Scrap, Some(&employee))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(ref m) if m == STATUS_FORBIDDEN));

        assert_eq!(f.service.get(request.id).await.unwrap().status, RequestStatus::New);
        assert!(!f.store.equipment_get(f.equipment_id).await.unwrap().is_scrapped);
    }

    #[tokio::test]
    async fn set_status_checks_existence_before_role() {
        let f = fixture().await;
        let err = f.service.set_status(999, RequestStatus::Repaired, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_privileged_update_ignores_status() {
        let f = fixture().await;
        let request = f.create("Pump leak", RequestType::Corrective).await;
        let employee = claims(vec![Role::Employee]);

        let updated = f
            .service
            .update(
                request.id,
                RequestEdit {
                    subject: "Pump leak (valve)".into(),
                    request_type: RequestType::Preventive,
                    status: Some(RequestStatus::Repaired),
                },
                Some(&employee),
            )
            .await
            .unwrap();

        assert_eq!(updated.subject, "Pump leak (valve)");
        assert_eq!(updated.request_type, RequestType::Preventive);
        assert_eq!(updated.status, RequestStatus::New);
    }

    #[tokio::test]
    async fn privileged_update_to_scrap_marks_equipment() {
        let f = fixture().await;
        let request = f.create("Pump leak", RequestType::Corrective).await;
        let tech = claims(vec![Role::MaintenanceTeam]);

        let updated = f
            .service
            .update(
                request.id,
                RequestEdit {
                    subject: "Pump leak".into(),
                    request_type: RequestType::Corrective,
                    status: Some(RequestStatus::Scrap),
                },
                Some(&tech),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, RequestStatus::Scrap);
        assert!(f.store.equipment_get(f.equipment_id).await.unwrap().is_scrapped);
    }

    #[tokio::test]
    async fn update_missing_request_is_not_found() {
        let f = fixture().await;
        let result = f
            .service
            .update(
                404,
                RequestEdit {
                    subject: "x".into(),
                    request_type: RequestType::Corrective,
                    status: None,
                },
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_is_gated_before_lookup() {
        let f = fixture().await;
        let request = f.create("Pump leak", RequestType::Corrective).await;

        let err = f.service.delete(999, None).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(ref m) if m == DELETE_FORBIDDEN));

        assert_err!(f.service.delete(request.id, Some(&claims(vec![Role::Admin]))).await);
        assert_ok!(f.service.get(request.id).await);

        let tech = claims(vec![Role::MaintenanceTeam]);
        assert_ok!(f.service.delete(request.id, Some(&tech)).await);
        assert!(matches!(f.service.get(request.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(f.service.delete(request.id, Some(&tech)).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn calendar_lists_only_preventive() {
        let f = fixture().await;
        f.create("Fix motor", RequestType::Corrective).await;
        let preventive = f.create("Quarterly check", RequestType::Preventive).await;

        let calendar = f.service.calendar().await.unwrap();

        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar[0].id, preventive.id);
    }

    #[tokio::test]
    async fn dashboard_breakdown_matches_statuses() {
        let f = fixture().await;
        let tech = claims(vec![Role::MaintenanceTeam]);
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(f.create(&format!("R{}", i), RequestType::Corrective).await.id);
        }
        f.service.set_status(ids[2], RequestStatus::InProgress, Some(&tech)).await.unwrap();
        f.service.set_status(ids[3], RequestStatus::Repaired, Some(&tech)).await.unwrap();
        f.service.set_status(ids[4], RequestStatus::Scrap, Some(&tech)).await.unwrap();

        let counts = f.service.count_by_status().await.unwrap();

        assert_eq!(
            counts,
            StatusCounts { new: 2, in_progress: 1, repaired: 1, scrap: 1 }
        );
        assert_eq!(counts.total(), 5);
    }

    #[tokio::test]
    async fn board_groups_by_stage_in_order() {
        let f = fixture().await;
        let tech = claims(vec![Role::MaintenanceTeam]);
        let a = f.create("A", RequestType::Corrective).await;
        f.create("B", RequestType::Corrective).await;
        f.service.set_status(a.id, RequestStatus::Repaired, Some(&tech)).await.unwrap();

        let board = f.service.board().await.unwrap();

        let statuses: Vec<_> = board.iter().map(|s| s.status).collect();
        assert_eq!(statuses, RequestStatus::ALL.to_vec());
        assert_eq!(board[0].requests.len(), 1);
        assert_eq!(board[2].requests[0].id, a.id);
        assert!(board[3].requests.is_empty());
    }

    #[tokio::test]
    async fn overdue_excludes_closed_requests() {
        let f = fixture().await;
        let tech = claims(vec![Role::MaintenanceTeam]);
        let past = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

        let mut ids = Vec::new();
        for subject in ["open", "done"] {
            let request = f
                .service
                .create(NewRequest {
                    subject: subject.into(),
                    equipment_id: f.equipment_id,
                    team_id: f.team_id,
                    request_type: RequestType::Preventive,
                    scheduled_date: Some(past),
                    duration: Some(2),
                })
                .await
                .unwrap();
            ids.push(request.id);
        }
        f.service.set_status(ids[1], RequestStatus::Repaired, Some(&tech)).await.unwrap();

        let overdue = f.service.list_overdue(today).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, ids[0]);
    }
}
