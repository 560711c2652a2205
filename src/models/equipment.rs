//! Equipment model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Equipment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    pub serial_no: String,
    pub department: String,
    pub location: String,
    /// Owning maintenance team
    pub team_id: i32,
    /// Set when a request on this equipment reaches Scrap; never cleared
    pub is_scrapped: bool,
}

/// Create equipment request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Serial number must be 1-50 characters"))]
    pub serial_no: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub department: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub location: String,
    pub team_id: i32,
}

/// Update equipment request.
///
/// The scrapped flag is not editable here; it only moves to `true` through
/// the request lifecycle.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub serial_no: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub team_id: Option<i32>,
}

/// Equipment list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    /// Only equipment owned by this team
    pub team_id: Option<i32>,
    /// Case-insensitive match on name or serial number (at least 2 characters)
    pub q: Option<String>,
}

impl Equipment {
    /// Case-insensitive substring match on name or serial number
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.serial_no.to_lowercase().contains(&needle)
    }
}
