// src/lib.rs

//! feedscan library
//!
//! Polls an image feed, runs OCR and a color heuristic on each new image,
//! and records or publishes the resulting tags.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
