//! Dedup stores and result sinks.
//!
//! A `DedupStore` answers "has this item been handled" before any network
//! or OCR work. A `Sink` persists or publishes a classification result.
//!
//! | Backend        | Dedup               | Sink                       |
//! |----------------|---------------------|----------------------------|
//! | `PgStore`      | unique `items_text` | insert-if-absent row       |
//! | `CursorStore`  | `id <= high-water`  | -                          |
//! | `TagSink`      | -                   | tag endpoint               |
//! | `MemoryStore`  | in-process set      | in-process set             |

pub mod cursor;
pub mod memory;
pub mod postgres;
pub mod tags;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ClassificationResult, ItemId};

// Re-export for convenience
pub use cursor::CursorStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use tags::TagSink;

/// Answers whether an item was already handled.
///
/// Implementations must tolerate concurrent checks from several workers.
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn is_processed(&self, item_id: ItemId) -> Result<bool>;
}

/// Persists or publishes a classification result.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn publish(&self, result: &ClassificationResult) -> Result<()>;
}

/// Publishes to several sinks in order, stopping at the first failure.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Sink for FanoutSink {
    async fn publish(&self, result: &ClassificationResult) -> Result<()> {
        for sink in &self.sinks {
            sink.publish(result).await?;
        }
        Ok(())
    }
}
