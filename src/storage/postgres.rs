// src/storage/postgres.rs

//! Postgres-backed dedup store and result sink.
//!
//! One table, `items_text`, keyed by item id. Inserts are insert-if-absent:
//! a second insert for the same id is a no-op, not an error. The pool is
//! size-capped; workers wait for a free connection.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::{AppError, Result};
use crate::models::{ClassificationResult, DatabaseConfig, ItemId, ProcessedRecord};
use crate::storage::{DedupStore, Sink};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS items_text (
    item_id BIGINT PRIMARY KEY,
    has_text BOOLEAN NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

/// Postgres storage for processed items.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a size-capped pool from configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| AppError::config("database.url is not set"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await?;

        log::info!(
            "Connected to database (max {} connections)",
            config.max_connections
        );
        Ok(Self { pool })
    }

    /// Create the table if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a record unless one exists. Returns whether a row was written.
    pub async fn insert(&self, record: &ProcessedRecord) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO items_text (item_id, has_text, created_at) VALUES ($1, $2, $3)
             ON CONFLICT (item_id) DO NOTHING",
        )
        .bind(record.item_id)
        .bind(record.has_text)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Number of recorded items.
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items_text")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl DedupStore for PgStore {
    async fn is_processed(&self, item_id: ItemId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM items_text WHERE item_id = $1)",
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl Sink for PgStore {
    async fn publish(&self, result: &ClassificationResult) -> Result<()> {
        let record = ProcessedRecord::from(result);
        if !self.insert(&record).await? {
            log::debug!("item {}: already recorded", record.item_id);
        }
        Ok(())
    }
}
