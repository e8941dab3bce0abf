// src/pipeline/processor.rs

//! Per-item processing: dedup check, download, classify, publish.

use std::sync::Arc;

use crate::models::{Item, Outcome, SkipReason};
use crate::pipeline::CleanupScheduler;
use crate::services::{Classifier, ImageFetcher};
use crate::storage::{DedupStore, Sink};

/// Executes the processing contract for a single item.
///
/// Failures are attributed to the item and returned as an `Outcome`; they
/// never abort the worker.
pub struct ItemProcessor {
    dedup: Arc<dyn DedupStore>,
    fetcher: Arc<dyn ImageFetcher>,
    classifier: Arc<Classifier>,
    sink: Arc<dyn Sink>,
    cleanup: Arc<CleanupScheduler>,
}

impl ItemProcessor {
    pub fn new(
        dedup: Arc<dyn DedupStore>,
        fetcher: Arc<dyn ImageFetcher>,
        classifier: Arc<Classifier>,
        sink: Arc<dyn Sink>,
        cleanup: Arc<CleanupScheduler>,
    ) -> Self {
        Self {
            dedup,
            fetcher,
            classifier,
            sink,
            cleanup,
        }
    }

    pub fn cleanup(&self) -> &Arc<CleanupScheduler> {
        &self.cleanup
    }

    /// Process one item to a terminal outcome.
    pub async fn process(&self, item: &Item) -> Outcome {
        if !item.is_image() {
            log::debug!("item {}: skipping non-image {}", item.id, item.image);
            return Outcome::Skipped(SkipReason::NotImage);
        }

        match self.dedup.is_processed(item.id).await {
            Ok(true) => {
                log::debug!("item {}: already processed", item.id);
                return Outcome::Skipped(SkipReason::AlreadyProcessed);
            }
            Ok(false) => {}
            Err(e) => {
                log::warn!("item {}: dedup check failed, skipping: {}", item.id, e);
                return Outcome::Skipped(SkipReason::CheckFailed);
            }
        }

        log::info!("item {}: checking {}", item.id, item.image);

        let path = match self.fetcher.fetch(item).await {
            Ok(path) => path,
            Err(e) => {
                log::warn!("item {}: download of {} failed: {}", item.id, item.image, e);
                return Outcome::Failed(e);
            }
        };

        let classified = self.classifier.classify(item.id, &path).await;
        self.cleanup.release(path).await;

        let result = match classified {
            Ok(result) => result,
            Err(e) => {
                log::warn!("item {}: classification failed: {}", item.id, e);
                return Outcome::Failed(e);
            }
        };

        if let Err(e) = self.sink.publish(&result).await {
            log::warn!("item {}: publishing result failed: {}", item.id, e);
            return Outcome::Failed(e);
        }

        if result.is_tagged() {
            log::info!("item {}: tagged [{}]", item.id, result.joined_tags());
        }
        Outcome::Processed(result)
    }
}
