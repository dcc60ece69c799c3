//! Persistent PostgreSQL store for channels that opted in to auto replies.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Per-channel opt-in flag.
///
/// A row's existence for `(guild_id, channel_id)` is the whole state.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    async fn is_active(&self, guild_id: &str, channel_id: &str) -> Result<bool, StoreError>;

    /// Insert the row. Already active is not an error.
    async fn activate(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError>;

    /// Delete the row. Not active is not an error.
    async fn deactivate(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError>;
}

/// Pooled PostgreSQL implementation of [`ChannelStore`].
///
/// Every operation checks a connection out of the pool for exactly one
/// statement; the `PoolConnection` guard hands it back on drop, so nothing is
/// held while the caller waits on Gemini.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a connection pool. The first connection is made eagerly so bad
    /// credentials fail at startup.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password);

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        info!(
            "Connected to PostgreSQL at {}:{}/{}",
            config.host, config.port, config.name
        );
        Ok(Self { pool })
    }

    /// Create the `active_channels` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS active_channels (
                guild_id TEXT,
                channel_id TEXT,
                PRIMARY KEY (guild_id, channel_id)
            )
            "#,
        )
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn active_count(&self) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM active_channels")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ChannelStore for Database {
    async fn is_active(&self, guild_id: &str, channel_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query(
            "SELECT 1 FROM active_channels WHERE guild_id = $1 AND channel_id = $2 LIMIT 1",
        )
        .bind(guild_id)
        .bind(channel_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.is_some())
    }

    async fn activate(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "INSERT INTO active_channels (guild_id, channel_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(guild_id)
        .bind(channel_id)
        .execute(&mut *conn)
        .await?;
        debug!(
            "activate {}/{}: {} row(s) inserted",
            guild_id,
            channel_id,
            result.rows_affected()
        );
        Ok(())
    }

    async fn deactivate(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM active_channels WHERE guild_id = $1 AND channel_id = $2")
            .bind(guild_id)
            .bind(channel_id)
            .execute(&mut *conn)
            .await?;
        debug!(
            "deactivate {}/{}: {} row(s) deleted",
            guild_id,
            channel_id,
            result.rows_affected()
        );
        Ok(())
    }
}
