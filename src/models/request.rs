//! Maintenance request model and lifecycle enums

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Request lifecycle status.
///
/// Flat enumeration: any status may be set from any other by a privileged actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RequestStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Repaired,
    Scrap,
}

impl RequestStatus {
    /// Board stages, in display order
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::New,
        RequestStatus::InProgress,
        RequestStatus::Repaired,
        RequestStatus::Scrap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::New => "New",
            RequestStatus::InProgress => "In Progress",
            RequestStatus::Repaired => "Repaired",
            RequestStatus::Scrap => "Scrap",
        }
    }

    /// Repaired and Scrap requests are never overdue
    pub fn is_closed(&self) -> bool {
        matches!(self, RequestStatus::Repaired | RequestStatus::Scrap)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(RequestStatus::New),
            "In Progress" => Ok(RequestStatus::InProgress),
            "Repaired" => Ok(RequestStatus::Repaired),
            "Scrap" => Ok(RequestStatus::Scrap),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// Request type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RequestType {
    /// Reactive repair
    Corrective,
    /// Scheduled upkeep, shown on the calendar
    Preventive,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Corrective => "Corrective",
            RequestType::Preventive => "Preventive",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Corrective" => Ok(RequestType::Corrective),
            "Preventive" => Ok(RequestType::Preventive),
            _ => Err(format!("Invalid request type: {}", s)),
        }
    }
}

// SQLx conversions: both enums are stored as their display strings
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_column!(RequestStatus);
text_column!(RequestType);

/// Maintenance request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenanceRequest {
    pub id: i32,
    pub subject: String,
    pub equipment_id: i32,
    /// Handling team; independent of the equipment's owning team
    pub team_id: i32,
    pub assigned_to: Option<i32>,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub scheduled_date: Option<NaiveDate>,
    /// Duration in hours
    pub duration: Option<i32>,
    pub crea_date: DateTime<Utc>,
}

impl MaintenanceRequest {
    /// Scheduled before `today` and still open
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.scheduled_date {
            Some(date) => !self.status.is_closed() && date < today,
            None => false,
        }
    }
}

/// Fields of a request to be created; status always starts at New
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewRequest {
    pub subject: String,
    pub equipment_id: i32,
    pub team_id: i32,
    pub request_type: RequestType,
    pub scheduled_date: Option<NaiveDate>,
    pub duration: Option<i32>,
}

/// Changes applied by a request update.
///
/// `status` is `None` when the status must be left untouched.
#[derive(Debug, Clone)]
pub struct RequestChanges {
    pub subject: String,
    pub request_type: RequestType,
    pub status: Option<RequestStatus>,
}

/// Criteria for listing requests; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
    /// Handling team
    pub team_id: Option<i32>,
    /// Overdue as of the date passed to `matches`
    pub overdue: Option<bool>,
}

impl RequestFilter {
    pub fn matches(&self, request: &MaintenanceRequest, today: NaiveDate) -> bool {
        self.request_type.map_or(true, |t| request.request_type == t)
            && self.status.map_or(true, |s| request.status == s)
            && self.team_id.map_or(true, |id| request.team_id == id)
            && self.overdue.map_or(true, |o| request.is_overdue(today) == o)
    }
}

/// Request counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusCounts {
    pub new: i64,
    pub in_progress: i64,
    pub repaired: i64,
    pub scrap: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.new + self.in_progress + self.repaired + self.scrap
    }

    pub fn add(&mut self, status: RequestStatus, n: i64) {
        match status {
            RequestStatus::New => self.new += n,
            RequestStatus::InProgress => self.in_progress += n,
            RequestStatus::Repaired => self.repaired += n,
            RequestStatus::Scrap => self.scrap += n,
        }
    }
}

/// One kanban column
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BoardStage {
    pub status: RequestStatus,
    pub requests: Vec<MaintenanceRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: RequestStatus, scheduled_date: Option<NaiveDate>) -> MaintenanceRequest {
        MaintenanceRequest {
            id: 1,
            subject: "Pump leak".into(),
            equipment_id: 1,
            team_id: 1,
            assigned_to: None,
            request_type: RequestType::Corrective,
            status,
            scheduled_date,
            duration: None,
            crea_date: Utc::now(),
        }
    }

    #[test]
    fn test_status_round_trips_display_strings() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_status_rejects_unknown_values() {
        assert!("Done".parse::<RequestStatus>().is_err());
        assert!("in progress".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_with_space() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn test_overdue_only_for_open_past_requests() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

        assert!(request(RequestStatus::New, Some(yesterday)).is_overdue(today));
        assert!(request(RequestStatus::InProgress, Some(yesterday)).is_overdue(today));
        assert!(!request(RequestStatus::Repaired, Some(yesterday)).is_overdue(today));
        assert!(!request(RequestStatus::Scrap, Some(yesterday)).is_overdue(today));
        assert!(!request(RequestStatus::New, Some(today)).is_overdue(today));
        assert!(!request(RequestStatus::New, None).is_overdue(today));
    }

    #[test]
    fn test_filter_requires_every_set_field() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let late = request(RequestStatus::New, NaiveDate::from_ymd_opt(2026, 3, 1));

        assert!(RequestFilter::default().matches(&late, today));
        assert!(RequestFilter { overdue: Some(true), team_id: Some(1), ..Default::default() }.matches(&late, today));
        assert!(!RequestFilter { overdue: Some(false), ..Default::default() }.matches(&late, today));
        assert!(!RequestFilter { status: Some(RequestStatus::Repaired), ..Default::default() }.matches(&late, today));
        assert!(!RequestFilter { team_id: Some(2), ..Default::default() }.matches(&late, today));
    }

    #[test]
    fn test_status_counts_total() {
        let mut counts = StatusCounts::default();
        counts.add(RequestStatus::New, 2);
        counts.add(RequestStatus::InProgress, 1);
        counts.add(RequestStatus::Repaired, 1);
        counts.add(RequestStatus::Scrap, 1);
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.new, 2);
    }
}
