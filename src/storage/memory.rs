// src/storage/memory.rs

//! In-process dedup store and sink.
//!
//! Keeps processed ids and published results in memory. Useful for dry runs
//! and for exercising the pipeline without a database.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ClassificationResult, ItemId};
use crate::storage::{DedupStore, Sink};

#[derive(Debug, Default)]
struct Inner {
    processed: HashSet<ItemId>,
    published: Vec<ClassificationResult>,
}

/// Memory-backed store with insert-if-absent semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already knows `ids`.
    pub fn with_processed(ids: impl IntoIterator<Item = ItemId>) -> Self {
        let store = Self::new();
        store.lock().processed.extend(ids);
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Results accepted by `publish`, in arrival order.
    pub fn published(&self) -> Vec<ClassificationResult> {
        self.lock().published.clone()
    }

    /// Ids of accepted results, sorted.
    pub fn published_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<_> = self.lock().published.iter().map(|r| r.item_id).collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn is_processed(&self, item_id: ItemId) -> Result<bool> {
        Ok(self.lock().processed.contains(&item_id))
    }
}

#[async_trait]
impl Sink for MemoryStore {
    async fn publish(&self, result: &ClassificationResult) -> Result<()> {
        let mut inner = self.lock();
        if inner.processed.insert(result.item_id) {
            inner.published.push(result.clone());
        } else {
            log::debug!("item {}: already recorded", result.item_id);
        }
        Ok(())
    }
}
