//! Utility functions and helpers.

pub mod http;

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.]+").expect("valid regex"));

/// Map an image path to a flat, filesystem-safe file name.
///
/// Every run of characters other than ASCII letters, digits and `.` becomes
/// a single `_`, so distinct paths stay distinct in practice while `..`
/// segments can never escape the cache directory.
pub fn cache_file_name(image_path: &str) -> String {
    let name = UNSAFE_CHARS.replace_all(image_path, "_").into_owned();
    if name.chars().all(|c| c == '.') {
        // "", "." and ".." are not usable file names
        format!("_{name}")
    } else {
        name
    }
}

/// Resolve a relative image reference against the image host.
///
/// References that carry their own scheme or host (`//host/x`,
/// `https://host/x`) are rejected as malformed.
pub fn image_url(base: &Url, image_path: &str) -> Result<Url> {
    let trimmed = image_path.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.contains("://") {
        return Err(AppError::malformed(image_path));
    }

    let url = base.join(trimmed.trim_start_matches('/'))?;
    if url.host_str() != base.host_str() {
        return Err(AppError::malformed(image_path));
    }
    Ok(url)
}
