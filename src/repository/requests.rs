//! Maintenance request methods on Repository

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgConnection;

use super::{Repository, RequestStore};
use crate::{
    error::{AppError, AppResult},
    models::request::{
        MaintenanceRequest, NewRequest, RequestChanges, RequestStatus, RequestType, StatusCounts,
    },
};

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Request {} not found", id))
}

/// Mark the equipment behind `request` scrapped, on the caller's transaction
async fn scrap_equipment(conn: &mut PgConnection, request: &MaintenanceRequest) -> AppResult<()> {
    sqlx::query("UPDATE equipment SET is_scrapped = TRUE WHERE id = $1")
        .bind(request.equipment_id)
        .execute(conn)
        .await?;
    tracing::info!(
        request_id = request.id,
        equipment_id = request.equipment_id,
        "Equipment marked as scrapped"
    );
    Ok(())
}

#[async_trait]
impl RequestStore for Repository {
    async fn requests_list(&self) -> AppResult<Vec<MaintenanceRequest>> {
        let rows = sqlx::query_as::<_, MaintenanceRequest>(
            "SELECT * FROM maintenance_requests ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn requests_get(&self, id: i32) -> AppResult<MaintenanceRequest> {
        sqlx::query_as::<_, MaintenanceRequest>("SELECT * FROM maintenance_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn requests_list_by_type(&self, request_type: RequestType) -> AppResult<Vec<MaintenanceRequest>> {
        let rows = sqlx::query_as::<_, MaintenanceRequest>(
            "SELECT * FROM maintenance_requests WHERE request_type = $1 ORDER BY scheduled_date NULLS LAST, id",
        )
        .bind(request_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn requests_list_overdue(&self, today: NaiveDate) -> AppResult<Vec<MaintenanceRequest>> {
        let rows = sqlx::query_as::<_, MaintenanceRequest>(
            r#"
            SELECT * FROM maintenance_requests
            WHERE scheduled_date < $1
              AND status NOT IN ('Repaired', 'Scrap')
            ORDER BY scheduled_date, id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn requests_create(&self, data: &NewRequest) -> AppResult<MaintenanceRequest> {
        let mut tx = self.pool.begin().await?;

        let (equipment_exists, team_exists): (bool, bool) = sqlx::query_as(
            r#"
            SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1),
                   EXISTS(SELECT 1 FROM teams WHERE id = $2)
            "#,
        )
        .bind(data.equipment_id)
        .bind(data.team_id)
        .fetch_one(&mut *tx)
        .await?;

        if !equipment_exists {
            return Err(AppError::Validation(format!("Equipment {} does not exist", data.equipment_id)));
        }
        if !team_exists {
            return Err(AppError::Validation(format!("Team {} does not exist", data.team_id)));
        }

        let row = sqlx::query_as::<_, MaintenanceRequest>(
            r#"
            INSERT INTO maintenance_requests
                (subject, equipment_id, team_id, request_type, status, scheduled_date, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&data.subject)
        .bind(data.equipment_id)
        .bind(data.team_id)
        .bind(data.request_type)
        .bind(RequestStatus::New)
        .bind(data.scheduled_date)
        .bind(data.duration)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn requests_set_status(&self, id: i32, status: RequestStatus) -> AppResult<MaintenanceRequest> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MaintenanceRequest>(
            "UPDATE maintenance_requests SET status = $1 WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

        if status == RequestStatus::Scrap {
            scrap_equipment(&mut tx, &row).await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    async fn requests_update(&self, id: i32, changes: &RequestChanges) -> AppResult<MaintenanceRequest> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MaintenanceRequest>(
            r#"
            UPDATE maintenance_requests
            SET subject = $1, request_type = $2, status = COALESCE($3, status)
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&changes.subject)
        .bind(changes.request_type)
        .bind(changes.status)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

        if changes.status == Some(RequestStatus::Scrap) {
            scrap_equipment(&mut tx, &row).await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    async fn requests_assign(&self, id: i32, user_id: Option<i32>) -> AppResult<MaintenanceRequest> {
        let mut tx = self.pool.begin().await?;

        if let Some(user_id) = user_id {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
            if !exists {
                return Err(AppError::NotFound(format!("User {} not found", user_id)));
            }
        }

        let row = sqlx::query_as::<_, MaintenanceRequest>(
            "UPDATE maintenance_requests SET assigned_to = $1 WHERE id = $2 RETURNING *",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn requests_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM maintenance_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn requests_count_by_status(&self) -> AppResult<StatusCounts> {
        let rows: Vec<(RequestStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM maintenance_requests GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(status, n);
        }
        Ok(counts)
    }
}
