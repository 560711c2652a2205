//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use super::SharedStore;
use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{CreateUser, NewUser, Role, User, UserClaims},
    repository::UserStore,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Clone)]
pub struct UsersService {
    store: SharedStore,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(store: SharedStore, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Authenticate by username and return a JWT token with the user
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .store
            .users_get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        if !self.verify_password(&user, password)? {
            tracing::warn!(username, "Failed login attempt");
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    pub fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.store.users_list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.store.users_get(id).await
    }

    /// Create a new user
    pub async fn create_user(&self, data: CreateUser) -> AppResult<User> {
        data.validate()?;

        let roles = if data.roles.is_empty() {
            vec![Role::Employee]
        } else {
            data.roles
        };

        let user = self
            .store
            .users_create(&NewUser {
                password_hash: self.hash_password(&data.password)?,
                username: data.username,
                name: data.name,
                email: data.email,
                roles,
            })
            .await?;
        tracing::info!(user_id = user.id, roles = ?user.roles, "User created");
        Ok(user)
    }

    /// Delete a user; their request assignments are cleared
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.store.users_delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Create the `admin` account on an empty user table when a bootstrap password is configured
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<Option<User>> {
        let Some(password) = self.config.bootstrap_admin_password.clone() else {
            return Ok(None);
        };
        if self.store.users_count().await? > 0 {
            return Ok(None);
        }

        let user = self
            .create_user(CreateUser {
                username: "admin".to_string(),
                password,
                name: "Administrator".to_string(),
                email: None,
                roles: vec![Role::Admin, Role::MaintenanceTeam],
            })
            .await?;
        tracing::warn!("Created bootstrap admin account; change its password");
        Ok(Some(user))
    }
}
