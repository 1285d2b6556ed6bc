//! Subject model: the category a course belongs to.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Subject record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

/// Subject annotated with the number of courses filed under it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubjectWithCourseCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub subject: Subject,
    pub course_count: i64,
}

impl Subject {
    /// Find a subject by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let subject = sqlx::query_as::<_, Subject>("SELECT * FROM subject WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch subject by id")?;

        Ok(subject)
    }

    /// Find a subject by slug.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>> {
        let subject = sqlx::query_as::<_, Subject>("SELECT * FROM subject WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
            .context("failed to fetch subject by slug")?;

        Ok(subject)
    }

    /// List all subjects ordered by title.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>> {
        let subjects = sqlx::query_as::<_, Subject>("SELECT * FROM subject ORDER BY title")
            .fetch_all(pool)
            .await
            .context("failed to list subjects")?;

        Ok(subjects)
    }

    /// List all subjects, each annotated with its course count.
    pub async fn list_with_course_counts(pool: &PgPool) -> Result<Vec<SubjectWithCourseCount>> {
        let subjects = sqlx::query_as::<_, SubjectWithCourseCount>(
            r#"
            SELECT s.id, s.title, s.slug, COUNT(c.id) AS course_count
            FROM subject s
            LEFT JOIN course c ON c.subject_id = s.id
            GROUP BY s.id, s.title, s.slug
            ORDER BY s.title
            "#,
        )
        .fetch_all(pool)
        .await
        .context("failed to list subjects with course counts")?;

        Ok(subjects)
    }

    /// Create a new subject.
    pub async fn create(pool: &PgPool, title: &str, slug: &str) -> Result<Self> {
        let subject = sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subject (id, title, slug)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(title)
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("failed to create subject")?;

        Ok(subject)
    }
}
