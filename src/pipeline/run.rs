// src/pipeline/run.rs

//! Run modes: one-shot backfill and the periodic poll loop.

use std::pin::pin;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::{ContentFlags, RunSummary};
use crate::pipeline::{Coordinator, ProcessingPolicy, Window};

/// Settings for the poll loop.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub flags: ContentFlags,
    pub max_age: chrono::Duration,
    pub interval: Duration,
    pub max_pages: usize,
    /// Run a single poll and return
    pub once: bool,
}

/// Walk the feed history once.
///
/// Pending scratch-file deletions are flushed before returning.
pub async fn run_backfill(
    coordinator: &Coordinator,
    window: &Window,
    policy: &ProcessingPolicy,
) -> Result<RunSummary> {
    log::info!("Starting backfill ({} policy)", policy.name());

    let result = coordinator.run(window, policy).await;
    coordinator.processor().cleanup().shutdown().await;

    let summary = result?;
    summary.log("Backfill complete");
    Ok(summary)
}

/// Poll the newest items on a fixed interval until Ctrl-C.
///
/// A failed poll is logged and retried on the next tick. Returns the totals
/// over all completed polls.
pub async fn run_poll(
    coordinator: &Coordinator,
    policy: &ProcessingPolicy,
    options: &PollOptions,
) -> Result<RunSummary> {
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_poll_until(coordinator, policy, options, interrupted).await
}

/// Poll until `shutdown` completes.
///
/// `shutdown` is watched both between ticks and while a poll runs; an
/// interrupted poll is abandoned and does not count towards the totals.
/// Pending cleanups are flushed before returning.
pub async fn run_poll_until(
    coordinator: &Coordinator,
    policy: &ProcessingPolicy,
    options: &PollOptions,
    shutdown: impl Future<Output = ()>,
) -> Result<RunSummary> {
    log::info!(
        "Polling every {}s for items newer than {}s ({} policy)",
        options.interval.as_secs(),
        options.max_age.num_seconds(),
        policy.name()
    );

    let mut shutdown = pin!(shutdown);
    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut totals = RunSummary::default();
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                log::info!("Interrupted, stopping poll loop");
                break;
            }
        }

        let polled = tokio::select! {
            polled = poll_once(coordinator, policy, options) => polled,
            _ = &mut shutdown => {
                log::info!("Interrupted during poll, stopping poll loop");
                break;
            }
        };

        match polled {
            Ok(summary) => {
                if summary.queued > 0 || summary.halted {
                    summary.log("Poll complete");
                } else {
                    log::debug!("Poll complete, nothing new");
                }
                totals.absorb(&summary);
            }
            Err(e) => log::warn!("Poll failed: {}", e),
        }

        if options.once {
            break;
        }
    }

    coordinator.processor().cleanup().shutdown().await;
    Ok(totals)
}

async fn poll_once(
    coordinator: &Coordinator,
    policy: &ProcessingPolicy,
    options: &PollOptions,
) -> Result<RunSummary> {
    let newer_than = match policy.cursor() {
        Some(cursor) => cursor.latest().await,
        None => None,
    };
    let window = Window::recent(options.flags, options.max_age)
        .newer_than(newer_than)
        .with_max_pages(options.max_pages);
    coordinator.run(&window, policy).await
}
