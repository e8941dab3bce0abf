// src/storage/cursor.rs

//! High-water-mark cursor.
//!
//! Holds the largest item id whose outcome is final. The value never moves
//! backwards. With a state file configured, each advance is written
//! atomically (temp file, then rename) so a restart resumes where the last
//! run stopped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::ItemId;
use crate::storage::DedupStore;

/// On-disk cursor state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CursorState {
    latest_id: ItemId,
    updated_at: DateTime<Utc>,
}

/// Monotonic cursor, optionally persisted.
#[derive(Debug)]
pub struct CursorStore {
    latest: Mutex<Option<ItemId>>,
    state_file: Option<PathBuf>,
}

impl CursorStore {
    /// In-memory cursor with no known position.
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            state_file: None,
        }
    }

    /// In-memory cursor starting at `latest`.
    pub fn starting_at(latest: ItemId) -> Self {
        Self {
            latest: Mutex::new(Some(latest)),
            state_file: None,
        }
    }

    /// Load the cursor from `path`; a missing file means no position yet.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let latest = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state: CursorState = serde_json::from_slice(&bytes)?;
                log::info!(
                    "Resuming after item {} (saved {})",
                    state.latest_id,
                    state.updated_at
                );
                Some(state.latest_id)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(AppError::Io(e)),
        };

        Ok(Self {
            latest: Mutex::new(latest),
            state_file: Some(path),
        })
    }

    /// Current high-water mark.
    pub async fn latest(&self) -> Option<ItemId> {
        *self.latest.lock().await
    }

    /// Move the cursor to `item_id` if that is further ahead.
    ///
    /// Returns whether the cursor moved. Call only once the item's outcome
    /// is final.
    pub async fn advance(&self, item_id: ItemId) -> Result<bool> {
        let mut latest = self.latest.lock().await;
        if latest.is_some_and(|current| current >= item_id) {
            return Ok(false);
        }
        *latest = Some(item_id);

        if let Some(path) = &self.state_file {
            let state = CursorState {
                latest_id: item_id,
                updated_at: Utc::now(),
            };
            write_atomic(path, &serde_json::to_vec_pretty(&state)?).await?;
        }
        Ok(true)
    }
}

impl Default for CursorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DedupStore for CursorStore {
    async fn is_processed(&self, item_id: ItemId) -> Result<bool> {
        Ok(self.latest().await.is_some_and(|latest| item_id <= latest))
    }
}

/// Write bytes atomically (write to temp, then rename).
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
