// src/models/mod.rs

//! Domain models for the scanner.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod item;
mod outcome;

// Re-export all public types
pub use config::{
    ApiConfig, CleanupMode, Config, DatabaseConfig, DownloadConfig, GrayConfig, OcrConfig,
    PipelineConfig, StateConfig, TagConfig,
};
pub use item::{ContentFlags, Item, ItemId, ItemPage, ItemsRequest};
pub use outcome::{ClassificationResult, Outcome, ProcessedRecord, RunSummary, SkipReason};
