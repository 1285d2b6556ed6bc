//! Course model and CRUD operations.
//!
//! A course is owned by the user who created it; every management operation
//! is scoped to that owner. The public catalog reads are unscoped.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Course record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,

    /// User who created the course; the only user allowed to mutate it.
    pub owner_id: Uuid,

    /// Subject the course is filed under.
    pub subject_id: Uuid,

    pub title: String,

    /// URL slug, unique across courses (enforced by the database).
    pub slug: String,

    pub overview: String,

    pub created: DateTime<Utc>,
}

/// The editable course fields. Owner and timestamps are never client-supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseForm {
    pub subject_id: Uuid,
    pub title: String,
    pub slug: String,
    pub overview: String,
}

/// Course annotated with the number of modules it contains.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CourseWithModuleCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub module_count: i64,
}

impl Course {
    /// Find a course by ID without ownership scoping.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM course WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch course by id")?;

        Ok(course)
    }

    /// Find a course by slug (public detail page).
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM course WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
            .context("failed to fetch course by slug")?;

        Ok(course)
    }

    /// Create a new course, stamping the acting user as owner.
    pub async fn create(pool: &PgPool, owner_id: Uuid, form: &CourseForm) -> Result<Self> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO course (id, owner_id, subject_id, title, slug, overview)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(form.subject_id)
        .bind(&form.title)
        .bind(&form.slug)
        .bind(&form.overview)
        .fetch_one(pool)
        .await
        .context("failed to create course")?;

        Ok(course)
    }

    /// Update a course owned by the given user.
    ///
    /// Returns `None` when the id does not resolve to a course owned by
    /// `owner_id`; callers cannot distinguish absence from foreign ownership.
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        form: &CourseForm,
    ) -> Result<Option<Self>> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE course
            SET subject_id = $1, title = $2, slug = $3, overview = $4
            WHERE id = $5 AND owner_id = $6
            RETURNING *
            "#,
        )
        .bind(form.subject_id)
        .bind(&form.title)
        .bind(&form.slug)
        .bind(&form.overview)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .context("failed to update course")?;

        Ok(course)
    }

    /// Delete a course owned by the given user. Modules and content links
    /// cascade at the database level.
    pub async fn delete_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM course WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await
            .context("failed to delete course")?;

        Ok(result.rows_affected() > 0)
    }

    /// List all courses with module counts, optionally filtered to a subject.
    pub async fn list_with_module_counts(
        pool: &PgPool,
        subject_id: Option<Uuid>,
    ) -> Result<Vec<CourseWithModuleCount>> {
        let courses = match subject_id {
            Some(subject_id) => {
                sqlx::query_as::<_, CourseWithModuleCount>(
                    r#"
                    SELECT c.*, COUNT(m.id) AS module_count
                    FROM course c
                    LEFT JOIN module m ON m.course_id = c.id
                    WHERE c.subject_id = $1
                    GROUP BY c.id
                    ORDER BY c.created DESC
                    "#,
                )
                .bind(subject_id)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, CourseWithModuleCount>(
                    r#"
                    SELECT c.*, COUNT(m.id) AS module_count
                    FROM course c
                    LEFT JOIN module m ON m.course_id = c.id
                    GROUP BY c.id
                    ORDER BY c.created DESC
                    "#,
                )
                .fetch_all(pool)
                .await
            }
        }
        .context("failed to list courses with module counts")?;

        Ok(courses)
    }
}
