//! Owner-scoped data access.
//!
//! Management views never query course data directly: they go through an
//! [`OwnerScope`], which pairs the connection pool with the acting user and
//! only ever returns rows that user owns. A row owned by someone else is
//! reported exactly like a row that does not exist.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Content, ContentItem, Course, ItemKind, Module};

/// A view of the course tables restricted to one owner.
#[derive(Debug, Clone, Copy)]
pub struct OwnerScope<'a> {
    pool: &'a PgPool,
    owner_id: Uuid,
}

impl<'a> OwnerScope<'a> {
    /// Wrap a pool with an owner filter.
    pub fn new(pool: &'a PgPool, owner_id: Uuid) -> Self {
        Self { pool, owner_id }
    }

    /// The owner this scope filters to.
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// List the owner's courses, newest first.
    pub async fn courses(&self) -> Result<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM course WHERE owner_id = $1 ORDER BY created DESC",
        )
        .bind(self.owner_id)
        .fetch_all(self.pool)
        .await
        .context("failed to list owned courses")?;

        Ok(courses)
    }

    /// Fetch one owned course.
    pub async fn course(&self, id: Uuid) -> Result<Option<Course>> {
        let course =
            sqlx::query_as::<_, Course>("SELECT * FROM course WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(self.owner_id)
                .fetch_optional(self.pool)
                .await
                .context("failed to fetch owned course")?;

        Ok(course)
    }

    /// Fetch a module whose course belongs to the owner.
    pub async fn module(&self, id: Uuid) -> Result<Option<Module>> {
        let module = sqlx::query_as::<_, Module>(
            r#"
            SELECT m.*
            FROM module m
            JOIN course ON course.id = m.course_id
            WHERE m.id = $1 AND course.owner_id = $2
            "#,
        )
        .bind(id)
        .bind(self.owner_id)
        .fetch_optional(self.pool)
        .await
        .context("failed to fetch owned module")?;

        Ok(module)
    }

    /// Fetch a content link owned through the module → course chain.
    pub async fn content(&self, id: Uuid) -> Result<Option<Content>> {
        Content::find_owned(self.pool, id, self.owner_id).await
    }

    /// Fetch an owned item of a specific kind.
    pub async fn item(&self, id: Uuid, kind: ItemKind) -> Result<Option<ContentItem>> {
        ContentItem::find_owned(self.pool, id, self.owner_id, kind).await
    }
}
