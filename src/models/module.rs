//! Module model: an ordered section of a course.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Module record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,

    /// Display position within the course. Assigned as one past the highest
    /// existing position at insert time, starting at 0.
    pub position: i32,
}

impl Module {
    /// Find a module by ID without ownership scoping.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let module = sqlx::query_as::<_, Module>("SELECT * FROM module WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch module by id")?;

        Ok(module)
    }

    /// List the modules of a course in display order.
    pub async fn list_by_course(pool: &PgPool, course_id: Uuid) -> Result<Vec<Self>> {
        let modules = sqlx::query_as::<_, Module>(
            "SELECT * FROM module WHERE course_id = $1 ORDER BY position",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await
        .context("failed to list modules")?;

        Ok(modules)
    }

    /// Append a module to a course.
    pub async fn create(
        pool: &PgPool,
        course_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Self> {
        let module = sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO module (id, course_id, title, description, position)
            VALUES ($1, $2, $3, $4,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM module WHERE course_id = $2))
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(course_id)
        .bind(title)
        .bind(description)
        .fetch_one(pool)
        .await
        .context("failed to create module")?;

        Ok(module)
    }

    /// Append a module inside an open transaction (formset commits).
    pub async fn insert_in_tx(
        conn: &mut PgConnection,
        course_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Self> {
        let module = sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO module (id, course_id, title, description, position)
            VALUES ($1, $2, $3, $4,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM module WHERE course_id = $2))
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(course_id)
        .bind(title)
        .bind(description)
        .fetch_one(conn)
        .await
        .context("failed to insert module")?;

        Ok(module)
    }

    /// Update a module's editable fields inside an open transaction.
    ///
    /// The course id is part of the predicate so a submission cannot reach
    /// into another course's modules.
    pub async fn update_in_tx(
        conn: &mut PgConnection,
        id: Uuid,
        course_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE module SET title = $1, description = $2 WHERE id = $3 AND course_id = $4",
        )
        .bind(title)
        .bind(description)
        .bind(id)
        .bind(course_id)
        .execute(conn)
        .await
        .context("failed to update module")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a module inside an open transaction. Content links cascade.
    pub async fn delete_in_tx(conn: &mut PgConnection, id: Uuid, course_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM module WHERE id = $1 AND course_id = $2")
            .bind(id)
            .bind(course_id)
            .execute(conn)
            .await
            .context("failed to delete module")?;

        Ok(result.rows_affected() > 0)
    }

    /// Set a module's position, but only when its course is owned by the
    /// given user. Rows that fail the ownership join are left untouched.
    pub async fn set_position_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        position: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE module
            SET position = $1
            FROM course
            WHERE module.id = $2
              AND module.course_id = course.id
              AND course.owner_id = $3
            "#,
        )
        .bind(position)
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await
        .context("failed to reposition module")?;

        Ok(result.rows_affected() > 0)
    }
}
