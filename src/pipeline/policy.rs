// src/pipeline/policy.rs

//! Strategies for consuming the work queue.
//!
//! - `Concurrent`: `W` workers pull from the queue, completion order is
//!   unspecified, and every item ends in exactly one outcome. Safe only
//!   with an id-keyed dedup store, since no cursor is advanced.
//! - `Ascending`: one worker processes the window in ascending id order
//!   and advances the cursor after each final outcome. The first non-final
//!   outcome halts the batch so the cursor never passes a failed item.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::models::{Item, Outcome, RunSummary};
use crate::pipeline::ItemProcessor;
use crate::storage::CursorStore;

/// How queued items are processed and how progress is recorded.
#[derive(Debug, Clone)]
pub enum ProcessingPolicy {
    /// Best-effort fan-out over `workers` concurrent units.
    Concurrent { workers: usize },
    /// Single worker, ascending ids, fail-fast, cursor-tracked.
    Ascending { cursor: Arc<CursorStore> },
}

impl ProcessingPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Concurrent { .. } => "concurrent",
            Self::Ascending { .. } => "ascending",
        }
    }

    /// Cursor to bound the fetch window with, if this policy keeps one.
    pub fn cursor(&self) -> Option<&Arc<CursorStore>> {
        match self {
            Self::Concurrent { .. } => None,
            Self::Ascending { cursor } => Some(cursor),
        }
    }

    /// Consume the queue until it is closed and drained.
    pub async fn drive(
        &self,
        queue: mpsc::Receiver<Item>,
        processor: Arc<ItemProcessor>,
    ) -> RunSummary {
        match self {
            Self::Concurrent { workers } => drive_concurrent(queue, processor, *workers).await,
            Self::Ascending { cursor } => drive_ascending(queue, processor, cursor).await,
        }
    }
}

async fn drive_concurrent(
    queue: mpsc::Receiver<Item>,
    processor: Arc<ItemProcessor>,
    workers: usize,
) -> RunSummary {
    let items = stream::unfold(queue, |mut queue| async move {
        queue.recv().await.map(|item| (item, queue))
    });

    let outcomes = items
        .map(|item| {
            let processor = Arc::clone(&processor);
            async move {
                let id = item.id;
                let outcome = tokio::spawn(async move { processor.process(&item).await })
                    .await
                    .unwrap_or_else(|e| Outcome::Failed(AppError::from(e)));
                (id, outcome)
            }
        })
        .buffer_unordered(workers.max(1));
    let mut outcomes = std::pin::pin!(outcomes);

    let mut summary = RunSummary::default();
    while let Some((id, outcome)) = outcomes.next().await {
        if let Outcome::Failed(e) = &outcome {
            log::debug!("item {}: failed: {}", id, e);
        }
        summary.queued += 1;
        summary.record(&outcome);
    }
    summary
}

async fn drive_ascending(
    mut queue: mpsc::Receiver<Item>,
    processor: Arc<ItemProcessor>,
    cursor: &CursorStore,
) -> RunSummary {
    let mut batch = Vec::new();
    while let Some(item) = queue.recv().await {
        batch.push(item);
    }
    batch.sort_by_key(|item| item.id);

    let mut summary = RunSummary {
        queued: batch.len(),
        ..RunSummary::default()
    };

    for (index, item) in batch.iter().enumerate() {
        let outcome = processor.process(item).await;
        summary.record(&outcome);

        if !outcome.is_final() {
            summary.halted = true;
            summary.deferred = batch.len() - index - 1;
            log::warn!(
                "item {}: processing failed, stopping batch with {} items left",
                item.id,
                summary.deferred
            );
            break;
        }

        if let Err(e) = cursor.advance(item.id).await {
            log::warn!("item {}: failed to persist cursor: {}", item.id, e);
        }
    }
    summary
}
