// src/storage/tags.rs

//! Publishes tags back to the feed through an authenticated session.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ClassificationResult;
use crate::services::{FeedClient, Session};
use crate::storage::Sink;

/// Sink calling the tag endpoint. Results without tags are not sent.
pub struct TagSink {
    client: Arc<FeedClient>,
    session: Session,
}

impl TagSink {
    pub fn new(client: Arc<FeedClient>, session: Session) -> Self {
        Self { client, session }
    }
}

#[async_trait]
impl Sink for TagSink {
    async fn publish(&self, result: &ClassificationResult) -> Result<()> {
        if !result.is_tagged() {
            log::debug!("item {}: no tags to add", result.item_id);
            return Ok(());
        }

        let tags: Vec<String> = result.tags.iter().cloned().collect();
        log::info!("item {}: adding tags {}", result.item_id, tags.join(", "));
        self.client
            .add_tags(&self.session, result.item_id, &tags)
            .await
    }
}
