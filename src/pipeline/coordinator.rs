// src/pipeline/coordinator.rs

//! Producer/consumer coordination over a bounded work queue.
//!
//! One producer task pages through the feed and enqueues items that pass the
//! window filters. The processing policy drains the queue. When the queue is
//! full the producer waits, so no more than `queue_capacity` items are held
//! between the two sides.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{ContentFlags, Item, ItemId, ItemsRequest, RunSummary};
use crate::pipeline::{ItemProcessor, ProcessingPolicy};
use crate::services::ItemSource;

/// Which part of the feed a run covers.
#[derive(Debug, Clone, Default)]
pub struct Window {
    pub flags: ContentFlags,
    /// Start paging below this id instead of at the newest item
    pub older_than: Option<ItemId>,
    /// Items at or below this id end the run
    pub newer_than: Option<ItemId>,
    /// Items posted longer ago than this end the run
    pub max_age: Option<chrono::Duration>,
    /// Page limit (0 = until the feed ends)
    pub max_pages: usize,
}

impl Window {
    /// Full history, newest first, optionally starting below `older_than`.
    pub fn backfill(flags: ContentFlags, older_than: Option<ItemId>) -> Self {
        Self {
            flags,
            older_than,
            ..Self::default()
        }
    }

    /// Recent items only.
    pub fn recent(flags: ContentFlags, max_age: chrono::Duration) -> Self {
        Self {
            flags,
            max_age: Some(max_age),
            ..Self::default()
        }
    }

    pub fn newer_than(mut self, id: Option<ItemId>) -> Self {
        self.newer_than = id;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

#[derive(Debug, Default)]
struct ProducerStats {
    pages: usize,
    queued: usize,
    too_old: usize,
}

/// Wires an item source to the processor through a bounded queue.
pub struct Coordinator {
    source: Arc<dyn ItemSource>,
    processor: Arc<ItemProcessor>,
    queue_capacity: usize,
}

impl Coordinator {
    pub fn new(
        source: Arc<dyn ItemSource>,
        processor: Arc<ItemProcessor>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            source,
            processor,
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn processor(&self) -> &Arc<ItemProcessor> {
        &self.processor
    }

    /// Process one window of the feed to completion.
    ///
    /// Items already queued are drained even when the source fails; the
    /// source error is returned afterwards.
    pub async fn run(&self, window: &Window, policy: &ProcessingPolicy) -> Result<RunSummary> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        log::debug!(
            "Starting {} run (flags {}, older than {:?}, newer than {:?})",
            policy.name(),
            window.flags.bits(),
            window.older_than,
            window.newer_than
        );

        let producer = tokio::spawn(produce(Arc::clone(&self.source), window.clone(), tx));
        let mut summary = policy.drive(rx, Arc::clone(&self.processor)).await;

        let stats = producer.await??;
        log::debug!(
            "Producer finished: {} pages, {} queued, {} outside window",
            stats.pages,
            stats.queued,
            stats.too_old
        );
        summary.too_old = stats.too_old;
        Ok(summary)
    }
}

/// Page through the feed and enqueue items until a stop condition.
async fn produce(
    source: Arc<dyn ItemSource>,
    window: Window,
    queue: mpsc::Sender<Item>,
) -> Result<ProducerStats> {
    let mut stats = ProducerStats::default();
    let mut request = ItemsRequest::new(window.flags);
    if let Some(older) = window.older_than {
        request = request.older_than(older);
    }

    loop {
        let page = source.fetch_page(&request).await?;
        stats.pages += 1;

        let Some(oldest) = page.oldest_id() else {
            log::debug!("Empty page, stopping");
            break;
        };

        let now = Utc::now();
        let mut reached_bound = false;

        for item in page.items {
            if let Some(bound) = window.newer_than {
                if item.id <= bound {
                    reached_bound = true;
                    continue;
                }
            }
            if let Some(max_age) = window.max_age {
                if item.is_older_than(max_age, now) {
                    stats.too_old += 1;
                    reached_bound = true;
                    continue;
                }
            }

            if queue.send(item).await.is_err() {
                log::debug!("Consumer gone, stopping producer");
                return Ok(stats);
            }
            stats.queued += 1;
        }

        if reached_bound || page.at_end {
            break;
        }
        if window.max_pages > 0 && stats.pages >= window.max_pages {
            log::debug!("Page limit {} reached", window.max_pages);
            break;
        }

        request = request.older_than(oldest);
    }

    Ok(stats)
}
