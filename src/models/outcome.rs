// src/models/outcome.rs

//! Classification results and per-item outcomes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ItemId;

/// Tags derived for one item. Produced by the classifier, consumed by sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub item_id: ItemId,
    pub has_text: bool,
    pub correct_gray: bool,
    pub tags: BTreeSet<String>,
}

impl ClassificationResult {
    /// Result with no positive analysis.
    pub fn empty(item_id: ItemId) -> Self {
        Self {
            item_id,
            has_text: false,
            correct_gray: false,
            tags: BTreeSet::new(),
        }
    }

    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Tags joined for logging and the tag endpoint.
    pub fn joined_tags(&self) -> String {
        self.tags.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Row of the `items_text` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub item_id: ItemId,
    pub has_text: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&ClassificationResult> for ProcessedRecord {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            item_id: result.item_id,
            has_text: result.has_text,
            created_at: Utc::now(),
        }
    }
}

/// Why an item was not classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The dedup store already knows this item
    AlreadyProcessed,
    /// Not a still image (video, gif, ...)
    NotImage,
    /// The dedup check itself failed
    CheckFailed,
}

/// Terminal outcome of processing one item.
#[derive(Debug)]
pub enum Outcome {
    Processed(ClassificationResult),
    Skipped(SkipReason),
    Failed(AppError),
}

impl Outcome {
    /// Whether the high-water mark may move past this item.
    pub fn is_final(&self) -> bool {
        match self {
            Self::Processed(_) => true,
            Self::Skipped(reason) => *reason != SkipReason::CheckFailed,
            Self::Failed(err) => err.is_permanent(),
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items handed to workers
    pub queued: usize,
    /// Items classified and published
    pub processed: usize,
    /// Processed items that received at least one tag
    pub tagged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Items dropped by the recency window before queueing
    pub too_old: usize,
    /// Queued items left for the next run after a halt
    pub deferred: usize,
    /// Batch stopped early on a failure
    pub halted: bool,
}

impl RunSummary {
    /// Count one terminal outcome.
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Processed(result) => {
                self.processed += 1;
                if result.is_tagged() {
                    self.tagged += 1;
                }
            }
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    /// Add the counters of another run.
    pub fn absorb(&mut self, other: &RunSummary) {
        self.queued += other.queued;
        self.processed += other.processed;
        self.tagged += other.tagged;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.too_old += other.too_old;
        self.deferred += other.deferred;
        self.halted |= other.halted;
    }

    /// Number of terminal outcomes recorded.
    ///
    /// Equals `queued - deferred` once a run has finished.
    pub fn outcomes(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    /// Write the counters to the log.
    pub fn log(&self, title: &str) {
        log::info!("[SUMMARY] {}", title);
        log::info!("    queued: {}", self.queued);
        log::info!("    processed: {} ({} tagged)", self.processed, self.tagged);
        log::info!("    skipped: {}", self.skipped);
        log::info!("    failed: {}", self.failed);
        if self.too_old > 0 {
            log::info!("    outside window: {}", self.too_old);
        }
        if self.halted {
            log::warn!("    halted on first failure, {} deferred", self.deferred);
        }
    }
}
