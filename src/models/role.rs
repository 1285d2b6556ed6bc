//! Role and permission models.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Well-known role IDs.
pub mod well_known {
    use uuid::Uuid;

    /// Anonymous user role (assigned to unauthenticated users).
    pub const ANONYMOUS_ROLE_ID: Uuid = Uuid::from_u128(1);

    /// Authenticated user role (assigned to all logged-in users).
    pub const AUTHENTICATED_ROLE_ID: Uuid = Uuid::from_u128(2);

    /// Instructor role (carries the course management permissions).
    pub const INSTRUCTOR_ROLE_ID: Uuid = Uuid::from_u128(3);
}

/// Role record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

impl Role {
    /// Find a role by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch role by id")?;

        Ok(role)
    }

    /// Get the permission names granted to a role.
    pub async fn get_permissions(pool: &PgPool, role_id: Uuid) -> Result<Vec<String>> {
        let permissions: Vec<String> = sqlx::query_scalar(
            "SELECT permission FROM role_permission WHERE role_id = $1",
        )
        .bind(role_id)
        .fetch_all(pool)
        .await
        .context("failed to fetch role permissions")?;

        Ok(permissions)
    }

    /// Get the permission names a user holds through role assignments.
    pub async fn get_user_permissions(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>> {
        let permissions: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT rp.permission
            FROM role_permission rp
            JOIN user_role ur ON ur.role_id = rp.role_id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("failed to fetch user permissions")?;

        Ok(permissions)
    }

    /// Assign a role to a user. A no-op if already assigned.
    pub async fn assign_to_user(pool: &PgPool, user_id: Uuid, role_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_role (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await
        .context("failed to assign role to user")?;

        Ok(())
    }

    /// Grant a permission to a role. A no-op if already granted.
    pub async fn grant_permission(pool: &PgPool, role_id: Uuid, permission: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO role_permission (role_id, permission)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission)
        .execute(pool)
        .await
        .context("failed to grant permission to role")?;

        Ok(())
    }
}
