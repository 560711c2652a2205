//! Team domain methods on Repository

use async_trait::async_trait;

use super::{Repository, TeamStore};
use crate::{
    error::{AppError, AppResult},
    models::team::{CascadeReport, Team, TeamInput},
};

#[async_trait]
impl TeamStore for Repository {
    async fn teams_list(&self) -> AppResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, Team>("SELECT * FROM teams ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn teams_get(&self, id: i32) -> AppResult<Team> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))
    }

    async fn teams_create(&self, data: &TeamInput) -> AppResult<Team> {
        let row = sqlx::query_as::<_, Team>("INSERT INTO teams (name) VALUES ($1) RETURNING *")
            .bind(&data.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn teams_update(&self, id: i32, data: &TeamInput) -> AppResult<Team> {
        sqlx::query_as::<_, Team>("UPDATE teams SET name = $1 WHERE id = $2 RETURNING *")
            .bind(&data.name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))
    }

    async fn teams_delete(&self, id: i32) -> AppResult<CascadeReport> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM teams WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Team {} not found", id)));
        }

        let requests = sqlx::query(
            r#"
            DELETE FROM maintenance_requests
            WHERE team_id = $1
               OR equipment_id IN (SELECT id FROM equipment WHERE team_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let equipment = sqlx::query("DELETE FROM equipment WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let teams = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(CascadeReport { teams, equipment, requests })
    }

    async fn teams_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
