//! User model, roles, JWT claims and the access policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Name of the role allowed to change status and delete requests
pub const MAINTENANCE_TEAM_ROLE: &str = "MaintenanceTeam";

/// Role memberships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Employee,
    MaintenanceTeam,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "Employee",
            Role::MaintenanceTeam => MAINTENANCE_TEAM_ROLE,
            Role::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Employee" => Ok(Role::Employee),
            MAINTENANCE_TEAM_ROLE => Ok(Role::MaintenanceTeam),
            "Admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Internal row structure for database queries (roles stored as TEXT[])
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    id: i32,
    username: String,
    name: String,
    email: Option<String>,
    password: String,
    roles: Vec<String>,
    crea_date: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            name: row.name,
            email: row.email,
            password: row.password,
            // Unknown role names are dropped rather than failing the whole row
            roles: row.roles.iter().filter_map(|r| r.parse().ok()).collect(),
            crea_date: row.crea_date,
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Display name
    pub name: String,
    pub email: Option<String>,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub roles: Vec<Role>,
    pub crea_date: DateTime<Utc>,
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 150, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// User with an already-hashed password, ready for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub roles: Vec<Role>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Claims for `user`, valid for `hours`
    pub fn for_user(user: &User, hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.username.clone(),
            user_id: user.id,
            roles: user.roles.clone(),
            exp: now + (hours as i64 * 3600),
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Member of the MaintenanceTeam role
    pub fn is_privileged(&self) -> bool {
        self.has_role(Role::MaintenanceTeam)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}

/// Access policy: anonymous callers are never privileged
pub fn is_privileged(user: Option<&UserClaims>) -> bool {
    user.map_or(false, UserClaims::is_privileged)
}

/// Fail with a Forbidden error carrying `message` unless `user` is privileged
pub fn require_privileged(user: Option<&UserClaims>, message: &str) -> Result<(), AppError> {
    if is_privileged(user) {
        Ok(())
    } else {
        tracing::warn!(
            user = user.map(|u| u.sub.as_str()).unwrap_or("anonymous"),
            "Denied privileged action: {}",
            message
        );
        Err(AppError::Authorization(message.to_string()))
    }
}
