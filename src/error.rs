// src/error.rs

//! Unified error handling for the scanner.

use std::fmt;

use thiserror::Error;

/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Database query or connection failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Image could not be opened or decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Image reference is not a relative path on the image host
    #[error("Malformed image reference '{reference}'")]
    MalformedInput { reference: String },

    /// OCR engine failed to run or exited unsuccessfully
    #[error("OCR error: {message}")]
    Ocr { message: String },

    /// OCR engine exceeded its time budget and was killed
    #[error("OCR timed out after {secs}s")]
    OcrTimeout { secs: u64 },

    /// Feed API returned an unexpected response
    #[error("API error for {context}: {message}")]
    Api { context: String, message: String },

    /// Login to the feed API was rejected
    #[error("Login failed: {0}")]
    Login(String),

    /// A spawned task panicked or was cancelled
    #[error("Task failed: {0}")]
    TaskJoin(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed-input error for an image reference.
    pub fn malformed(reference: impl Into<String>) -> Self {
        Self::MalformedInput {
            reference: reference.into(),
        }
    }

    /// Create an OCR error.
    pub fn ocr(message: impl fmt::Display) -> Self {
        Self::Ocr {
            message: message.to_string(),
        }
    }

    /// Create an API error with context.
    pub fn api(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Api {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether retrying the same item can never succeed.
    ///
    /// Permanent failures may be passed by the cursor; transient ones must not.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::MalformedInput { .. })
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
