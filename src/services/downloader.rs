// src/services/downloader.rs

//! Image downloader with a local scratch cache.
//!
//! Files are keyed by a sanitized form of the image path. A non-empty file
//! at that path is a cache hit and no request is made. Bodies are streamed
//! into a per-download `.part` file that is renamed into place only once
//! the transfer completed, so an interrupted download never looks like a
//! cache hit.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Response;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::Result;
use crate::models::{Config, Item};
use crate::utils::{cache_file_name, http, image_url};

static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Fetches an item's image into local storage.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Return a local path holding the full image bytes.
    async fn fetch(&self, item: &Item) -> Result<PathBuf>;
}

/// Downloads images from the image host into a cache directory.
pub struct Downloader {
    client: reqwest::Client,
    image_base: Url,
    cache_dir: PathBuf,
}

impl Downloader {
    pub fn new(client: reqwest::Client, image_base: Url, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            image_base,
            cache_dir: cache_dir.into(),
        }
    }

    /// Create a downloader with its own HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http::create_async_client(&config.api)?;
        let image_base = Url::parse(&config.api.image_base_url)?;
        Ok(Self::new(client, image_base, &config.download.cache_dir))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache location for an image path.
    pub fn cache_path(&self, image_path: &str) -> PathBuf {
        self.cache_dir.join(cache_file_name(image_path))
    }

    /// Download `image_path` unless a non-empty cached copy exists.
    pub async fn download(&self, image_path: &str) -> Result<PathBuf> {
        let url = image_url(&self.image_base, image_path)?;
        let target = self.cache_path(image_path);

        if let Ok(meta) = fs::metadata(&target).await {
            if meta.is_file() && meta.len() > 0 {
                log::debug!("Cache hit for {} at {}", image_path, target.display());
                return Ok(target);
            }
        }

        fs::create_dir_all(&self.cache_dir).await?;

        log::debug!("Downloading {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let response = http::ensure_success(response).await?;

        self.store(response, &target).await?;
        Ok(target)
    }

    /// Stream a response body to `target` via a partial file.
    async fn store(&self, mut response: Response, target: &Path) -> Result<()> {
        let partial = partial_path(target);

        let mut file = match fs::File::create(&partial).await {
            Ok(file) => file,
            Err(err) => {
                http::drain(response).await;
                return Err(err.into());
            }
        };

        let copied = copy_body(&mut response, &mut file).await;
        drop(file);

        match copied {
            Ok(bytes) => {
                if let Err(err) = fs::rename(&partial, target).await {
                    let _ = fs::remove_file(&partial).await;
                    return Err(err.into());
                }
                log::debug!("Stored {} bytes at {}", bytes, target.display());
                Ok(())
            }
            Err(err) => {
                http::drain(response).await;
                let _ = fs::remove_file(&partial).await;
                Err(err)
            }
        }
    }
}

#[async_trait]
impl ImageFetcher for Downloader {
    async fn fetch(&self, item: &Item) -> Result<PathBuf> {
        self.download(&item.image).await
    }
}

async fn copy_body(response: &mut Response, file: &mut fs::File) -> Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// Unique partial file next to `target`, so concurrent downloads of the
/// same image never share one.
fn partial_path(target: &Path) -> PathBuf {
    let seq = PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{}.part", std::process::id(), seq));
    target.with_file_name(name)
}
