//! Data models for GearGuard

pub mod equipment;
pub mod request;
pub mod team;
pub mod user;

// Re-export commonly used types
pub use equipment::Equipment;
pub use request::{MaintenanceRequest, RequestStatus, RequestType, StatusCounts};
pub use team::{CascadeReport, Team};
pub use user::{Role, User, UserClaims};
