//! Pipeline stages and run modes.
//!
//! - `run_backfill`: Walk the feed history once
//! - `run_poll`: Periodically process the newest items
//!
//! Both feed a `Coordinator`, which runs one producer and drains the queue
//! with a `ProcessingPolicy`. Each item goes through `ItemProcessor`.

pub mod cleanup;
pub mod coordinator;
pub mod policy;
pub mod processor;
pub mod run;

pub use cleanup::{CleanupPolicy, CleanupScheduler};
pub use coordinator::{Coordinator, Window};
pub use policy::ProcessingPolicy;
pub use processor::ItemProcessor;
pub use run::{PollOptions, run_backfill, run_poll, run_poll_until};
