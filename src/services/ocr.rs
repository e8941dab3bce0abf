// src/services/ocr.rs

//! Text recognition through an external OCR executable.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::OcrConfig;

/// Recognizes text in an image file.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Return the raw recognized text.
    async fn recognize(&self, path: &Path) -> Result<String>;
}

/// Runs `<binary> <file> stdout [-l <language>]` and reads standard output.
///
/// The process is killed once the timeout expires.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: String,
    timeout: Duration,
    language: Option<String>,
}

impl TesseractCli {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            language: None,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            language: config.language.clone(),
        }
    }

    fn command(&self, path: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command.arg(path).arg("stdout");
        if let Some(language) = &self.language {
            command.arg("-l").arg(language);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, path: &Path) -> Result<String> {
        let child = self
            .command(path)
            .spawn()
            .map_err(|e| AppError::ocr(format!("failed to run {}: {}", self.binary, e)))?;

        // Dropping the child on timeout kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(AppError::OcrTimeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
