//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use redis::Client as RedisClient;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::permissions::PermissionService;
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Redis client, used for the health probe. Sessions hold their own
    /// connection through the session store.
    redis: RedisClient,

    /// Permission service for access control.
    permissions: PermissionService,

    /// Theme engine for template rendering.
    theme: Arc<ThemeEngine>,
}

impl AppState {
    /// Create new application state with database connections.
    pub async fn new(config: &Config) -> Result<Self> {
        // Create PostgreSQL pool
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        // Run migrations
        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        // Create Redis client and verify it is reachable
        let redis = RedisClient::open(config.redis_url.as_str())
            .context("failed to create Redis client")?;

        let mut conn = redis
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to Redis")?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;

        // Create permission service
        let permissions = PermissionService::new(db.clone());

        // Create theme engine
        info!(dir = ?config.templates_dir, "loading templates from directory");
        let theme = Arc::new(
            ThemeEngine::new(&config.templates_dir)
                .inspect_err(
                    |e| tracing::warn!(error = ?e, "failed to load templates, using empty engine"),
                )
                .unwrap_or_else(|_| ThemeEngine::empty()),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db,
                redis,
                permissions,
                theme,
            }),
        })
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the permission service.
    pub fn permissions(&self) -> &PermissionService {
        &self.inner.permissions
    }

    /// Get the theme engine.
    pub fn theme(&self) -> &Arc<ThemeEngine> {
        &self.inner.theme
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }

    /// Check if Redis is healthy.
    pub async fn redis_healthy(&self) -> bool {
        let Ok(mut conn) = self.inner.redis.get_multiplexed_async_connection().await else {
            return false;
        };

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}
