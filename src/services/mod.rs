//! Service layer for the scanner.
//!
//! This module contains the business logic for:
//! - Feed access and tag publishing (`FeedClient`)
//! - Image download into the scratch cache (`Downloader`)
//! - Text recognition (`OcrEngine`, `TesseractCli`)
//! - Item classification (`Classifier`, `GrayDetector`)

mod api;
mod classifier;
mod downloader;
mod ocr;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ItemPage, ItemsRequest};

pub use api::{FeedClient, Session, nonce_from_cookie_header};
pub use classifier::{Classifier, GrayDetector, clean_ocr_text};
pub use downloader::{Downloader, ImageFetcher};
pub use ocr::{OcrEngine, TesseractCli};

/// Paged access to the item feed.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Fetch one page of items, newest first.
    async fn fetch_page(&self, request: &ItemsRequest) -> Result<ItemPage>;
}
