//! User methods on Repository

use async_trait::async_trait;

use super::{Repository, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, User, UserRow},
};

#[async_trait]
impl UserStore for Repository {
    async fn users_list(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn users_get(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn users_get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn users_create(&self, data: &NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(&data.username)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            return Err(AppError::Conflict(format!("Username {} already exists", data.username)));
        }

        let roles: Vec<String> = data.roles.iter().map(|r| r.as_str().to_string()).collect();
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, name, email, password, roles)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.username)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(roles)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn users_delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE maintenance_requests SET assigned_to = NULL WHERE assigned_to = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn users_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
