// src/pipeline/cleanup.rs

//! Scratch file cleanup.
//!
//! Deferred deletions are tracked tasks rather than detached timers. On
//! `shutdown` every pending deletion runs immediately and is awaited.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::models::{CleanupMode, DownloadConfig};

/// What to do with a scratch file once its item is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    Keep,
    Immediate,
    Deferred(Duration),
}

impl CleanupPolicy {
    pub fn from_config(config: &DownloadConfig) -> Self {
        match config.cleanup {
            CleanupMode::Keep => Self::Keep,
            CleanupMode::Immediate => Self::Immediate,
            CleanupMode::Deferred => Self::Deferred(Duration::from_secs(config.cleanup_delay_secs)),
        }
    }
}

/// Owns pending deletions for the lifetime of a run.
pub struct CleanupScheduler {
    policy: CleanupPolicy,
    tasks: Mutex<JoinSet<()>>,
    shutdown: watch::Sender<bool>,
}

impl CleanupScheduler {
    pub fn new(policy: CleanupPolicy) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            policy,
            tasks: Mutex::new(JoinSet::new()),
            shutdown,
        }
    }

    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hand a scratch file over according to the policy.
    pub async fn release(&self, path: PathBuf) {
        match self.policy {
            CleanupPolicy::Keep => {}
            CleanupPolicy::Immediate => remove(path).await,
            CleanupPolicy::Deferred(delay) => self.schedule(path, delay),
        }
    }

    /// Delete `path` after `delay`, or earlier on shutdown.
    pub fn schedule(&self, path: PathBuf, delay: Duration) {
        let stop = self.shutdown.subscribe();
        let mut tasks = self.tasks();

        // Reap finished deletions so the set stays small.
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stopped(stop) => {}
            }
            remove(path).await;
        });
    }

    /// Number of deletions not yet finished.
    pub fn pending(&self) -> usize {
        self.tasks().len()
    }

    /// Run all pending deletions now and wait for them.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let mut tasks = std::mem::take(&mut *self.tasks());
        let count = tasks.len();
        while tasks.join_next().await.is_some() {}
        if count > 0 {
            log::info!("Flushed {} pending cleanups", count);
        }
    }
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            return;
        }
    }
}

async fn remove(path: PathBuf) {
    match tokio::fs::remove_file(&path).await {
        Ok(()) => log::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
