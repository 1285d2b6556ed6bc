//! Content items and the ordered links tying them to modules.
//!
//! An item is one of four concrete kinds (text, video, image, file), each
//! carrying a single kind-specific payload. A `Content` row links an item
//! into a module and carries its display position. The link column is
//! polymorphic, so it intentionally has no foreign key to the item table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// The closed set of content item kinds.
///
/// Request paths select a kind by name; anything outside this list fails
/// resolution before any persistence is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "item_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Video,
    Image,
    File,
}

impl ItemKind {
    /// Resolve a path segment against the allow-list.
    pub fn from_path_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    /// Machine name, as used in paths and the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Video => "video",
            Self::Image => "image",
            Self::File => "file",
        }
    }

    /// Label for the kind-specific payload field in edit forms.
    pub fn payload_label(self) -> &'static str {
        match self {
            Self::Text => "Content",
            Self::Video => "Video URL",
            Self::Image => "Image path",
            Self::File => "File path",
        }
    }
}

/// Shared rendering capability over the item kinds.
///
/// Templates only need a short summary and a kind-specific partial; the
/// concrete schemas stay independent.
pub trait Renderable {
    /// One-line summary for listings.
    fn summary(&self) -> String;

    /// Template partial used to render the full item.
    fn template_name(&self) -> &'static str;
}

/// Kind-specific view of an item's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemBody<'a> {
    Text { content: &'a str },
    Video { url: &'a str },
    Image { path: &'a str },
    File { path: &'a str },
}

impl<'a> ItemBody<'a> {
    /// View a raw payload through its kind.
    pub fn new(kind: ItemKind, payload: &'a str) -> Self {
        match kind {
            ItemKind::Text => ItemBody::Text { content: payload },
            ItemKind::Video => ItemBody::Video { url: payload },
            ItemKind::Image => ItemBody::Image { path: payload },
            ItemKind::File => ItemBody::File { path: payload },
        }
    }
}

/// One-line listing summary for a titled item body.
fn summarize(title: &str, body: ItemBody<'_>) -> String {
    match body {
        ItemBody::Text { content } => {
            let mut s: String = content.chars().take(120).collect();
            if content.chars().count() > 120 {
                s.push('…');
            }
            s
        }
        ItemBody::Video { url } => format!("{title} ({url})"),
        ItemBody::Image { path } | ItemBody::File { path } => format!("{title} ({path})"),
    }
}

/// Template partial for a kind.
fn kind_template(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Text => "content/text.html",
        ItemKind::Video => "content/video.html",
        ItemKind::Image => "content/image.html",
        ItemKind::File => "content/file.html",
    }
}

/// A concrete content item.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: ItemKind,
    pub title: String,

    /// Kind-specific payload: body text, video URL, image path, or file path.
    pub payload: String,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ContentItem {
    /// The payload seen through its concrete kind.
    pub fn body(&self) -> ItemBody<'_> {
        ItemBody::new(self.kind, &self.payload)
    }
}

impl Renderable for ContentItem {
    fn summary(&self) -> String {
        summarize(&self.title, self.body())
    }

    fn template_name(&self) -> &'static str {
        kind_template(self.kind)
    }
}

impl ContentItem {
    /// Find an item by id, owner, and kind.
    ///
    /// All three must match; a kind mismatch is indistinguishable from an
    /// absent row.
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        kind: ItemKind,
    ) -> Result<Option<Self>> {
        let item = sqlx::query_as::<_, ContentItem>(
            "SELECT * FROM item WHERE id = $1 AND owner_id = $2 AND kind = $3",
        )
        .bind(id)
        .bind(owner_id)
        .bind(kind)
        .fetch_optional(pool)
        .await
        .context("failed to fetch item")?;

        Ok(item)
    }

    /// Find an item by id alone.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let item = sqlx::query_as::<_, ContentItem>("SELECT * FROM item WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch item by id")?;

        Ok(item)
    }

    /// Create a new item, stamping the acting user as owner.
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        kind: ItemKind,
        title: &str,
        payload: &str,
    ) -> Result<Self> {
        let item = sqlx::query_as::<_, ContentItem>(
            r#"
            INSERT INTO item (id, owner_id, kind, title, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(kind)
        .bind(title)
        .bind(payload)
        .fetch_one(pool)
        .await
        .context("failed to create item")?;

        Ok(item)
    }

    /// Update an owned item's editable fields.
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        payload: &str,
    ) -> Result<Option<Self>> {
        let item = sqlx::query_as::<_, ContentItem>(
            r#"
            UPDATE item
            SET title = $1, payload = $2, updated = now()
            WHERE id = $3 AND owner_id = $4
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(payload)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .context("failed to update item")?;

        Ok(item)
    }

    /// Delete an item.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM item WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete item")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Link row associating a module with one content item, in display order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Content {
    pub id: Uuid,
    pub module_id: Uuid,
    pub item_id: Uuid,
    pub position: i32,
}

/// Content link joined with its item, for module content listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContentWithItem {
    pub id: Uuid,
    pub module_id: Uuid,
    pub item_id: Uuid,
    pub position: i32,
    pub kind: ItemKind,
    pub title: String,
    pub payload: String,
}

impl Renderable for ContentWithItem {
    fn summary(&self) -> String {
        summarize(&self.title, ItemBody::new(self.kind, &self.payload))
    }

    fn template_name(&self) -> &'static str {
        kind_template(self.kind)
    }
}

impl Content {
    /// Link an item into a module, appending it to the module's ordering.
    pub async fn create(pool: &PgPool, module_id: Uuid, item_id: Uuid) -> Result<Self> {
        let content = sqlx::query_as::<_, Content>(
            r#"
            INSERT INTO content (id, module_id, item_id, position)
            VALUES ($1, $2, $3,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM content WHERE module_id = $2))
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(module_id)
        .bind(item_id)
        .fetch_one(pool)
        .await
        .context("failed to create content link")?;

        Ok(content)
    }

    /// Find a content link whose module's course is owned by the given user.
    pub async fn find_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Option<Self>> {
        let content = sqlx::query_as::<_, Content>(
            r#"
            SELECT c.*
            FROM content c
            JOIN module m ON m.id = c.module_id
            JOIN course ON course.id = m.course_id
            WHERE c.id = $1 AND course.owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch content link")?;

        Ok(content)
    }

    /// List a module's content links joined with their items, in order.
    pub async fn list_by_module(pool: &PgPool, module_id: Uuid) -> Result<Vec<ContentWithItem>> {
        let contents = sqlx::query_as::<_, ContentWithItem>(
            r#"
            SELECT c.id, c.module_id, c.item_id, c.position,
                   i.kind, i.title, i.payload
            FROM content c
            JOIN item i ON i.id = c.item_id
            WHERE c.module_id = $1
            ORDER BY c.position
            "#,
        )
        .bind(module_id)
        .fetch_all(pool)
        .await
        .context("failed to list module content")?;

        Ok(contents)
    }

    /// Delete a content link row.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete content link")?;

        Ok(result.rows_affected() > 0)
    }

    /// Set a content link's position, but only when it is owned through the
    /// module → course → owner chain.
    pub async fn set_position_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        position: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE content
            SET position = $1
            FROM module m
            JOIN course ON course.id = m.course_id
            WHERE content.id = $2
              AND content.module_id = m.id
              AND course.owner_id = $3
            "#,
        )
        .bind(position)
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await
        .context("failed to reposition content")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_resolution_accepts_only_the_allow_list() {
        assert_eq!(ItemKind::from_path_name("text"), Some(ItemKind::Text));
        assert_eq!(ItemKind::from_path_name("video"), Some(ItemKind::Video));
        assert_eq!(ItemKind::from_path_name("image"), Some(ItemKind::Image));
        assert_eq!(ItemKind::from_path_name("file"), Some(ItemKind::File));

        assert_eq!(ItemKind::from_path_name("audio"), None);
        assert_eq!(ItemKind::from_path_name("Text"), None);
        assert_eq!(ItemKind::from_path_name(""), None);
    }

    #[test]
    fn kind_round_trips_through_its_name() {
        for kind in [
            ItemKind::Text,
            ItemKind::Video,
            ItemKind::Image,
            ItemKind::File,
        ] {
            assert_eq!(ItemKind::from_path_name(kind.as_str()), Some(kind));
        }
    }

    fn item_of_kind(kind: ItemKind, payload: &str) -> ContentItem {
        ContentItem {
            id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            kind,
            title: "Lesson".to_string(),
            payload: payload.to_string(),
            created: Utc::now(),
            updated: Utc::now(),
        }
    }

    #[test]
    fn text_summary_truncates_long_bodies() {
        let body = "x".repeat(500);
        let item = item_of_kind(ItemKind::Text, &body);

        let summary = item.summary();
        assert!(summary.chars().count() <= 121);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn media_summary_includes_payload() {
        let item = item_of_kind(ItemKind::Video, "https://example.com/v.mp4");
        assert_eq!(item.summary(), "Lesson (https://example.com/v.mp4)");
    }

    #[test]
    fn body_matches_kind() {
        let item = item_of_kind(ItemKind::Video, "https://example.com/v.mp4");
        assert_eq!(
            item.body(),
            ItemBody::Video {
                url: "https://example.com/v.mp4"
            }
        );

        let item = item_of_kind(ItemKind::Text, "hello");
        assert_eq!(item.body(), ItemBody::Text { content: "hello" });
    }

    #[test]
    fn template_names_follow_kind() {
        assert_eq!(
            item_of_kind(ItemKind::Image, "a.png").template_name(),
            "content/image.html"
        );
        assert_eq!(
            item_of_kind(ItemKind::File, "a.pdf").template_name(),
            "content/file.html"
        );
    }
}
