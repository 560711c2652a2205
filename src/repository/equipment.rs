//! Equipment domain methods on Repository

use async_trait::async_trait;
use sqlx::PgConnection;

use super::{EquipmentStore, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
        team::CascadeReport,
    },
};

async fn ensure_team_exists(conn: &mut PgConnection, team_id: i32) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE id = $1)")
        .bind(team_id)
        .fetch_one(conn)
        .await?;
    if !exists {
        return Err(AppError::Validation(format!("Team {} does not exist", team_id)));
    }
    Ok(())
}

async fn ensure_serial_free(conn: &mut PgConnection, serial_no: &str, except: Option<i32>) -> AppResult<()> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM equipment WHERE serial_no = $1 AND ($2::int IS NULL OR id <> $2))",
    )
    .bind(serial_no)
    .bind(except)
    .fetch_one(conn)
    .await?;
    if taken {
        return Err(AppError::Conflict(
            "Equipment with this serial number already exists".to_string(),
        ));
    }
    Ok(())
}

/// Substring pattern for `ILIKE ... ESCAPE '\'` with `%` and `_` taken literally
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl EquipmentStore for Repository {
    async fn equipment_list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let pattern = query.q.as_deref().map(contains_pattern);
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE ($1::int IS NULL OR team_id = $1)
              AND ($2::text IS NULL OR name ILIKE $2 ESCAPE '\' OR serial_no ILIKE $2 ESCAPE '\')
            ORDER BY name
            "#,
        )
        .bind(query.team_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn equipment_get(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn equipment_create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;
        ensure_team_exists(&mut tx, data.team_id).await?;
        ensure_serial_free(&mut tx, &data.serial_no, None).await?;

        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (name, serial_no, department, location, team_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.serial_no)
        .bind(&data.department)
        .bind(&data.location)
        .bind(data.team_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn equipment_update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;
        if let Some(team_id) = data.team_id {
            ensure_team_exists(&mut tx, team_id).await?;
        }
        if let Some(ref serial_no) = data.serial_no {
            ensure_serial_free(&mut tx, serial_no, Some(id)).await?;
        }

        let mut sets = Vec::new();
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.serial_no, "serial_no");
        add_field!(data.department, "department");
        add_field!(data.location, "location");
        add_field!(data.team_id, "team_id");

        let query = if sets.is_empty() {
            format!("SELECT * FROM equipment WHERE id = ${}", idx)
        } else {
            format!("UPDATE equipment SET {} WHERE id = ${} RETURNING *", sets.join(", "), idx)
        };

        let mut builder = sqlx::query_as::<_, Equipment>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.serial_no);
        bind_field!(data.department);
        bind_field!(data.location);
        bind_field!(data.team_id);

        let row = builder
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn equipment_delete(&self, id: i32) -> AppResult<CascadeReport> {
        let mut tx = self.pool.begin().await?;

        let requests = sqlx::query("DELETE FROM maintenance_requests WHERE equipment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let equipment = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if equipment == 0 {
            // Dropping the transaction rolls back the request deletion
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }

        tx.commit().await?;
        Ok(CascadeReport { teams: 0, equipment, requests })
    }

    async fn equipment_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("press"), "%press%");
        assert_eq!(contains_pattern("50%"), r"%50\%%");
        assert_eq!(contains_pattern("SN_1"), r"%SN\_1%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }
}
