// src/services/classifier.rs

//! Item classification.
//!
//! Two independent analyses run against a downloaded file:
//! - text detection through the OCR engine
//! - a "correct gray" check sampling the top pixel row
//!
//! Positive results become tags.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, ImageReader, Pixel};

use crate::error::Result;
use crate::models::{ClassificationResult, Config, GrayConfig, ItemId, TagConfig};
use crate::services::OcrEngine;

/// Strip everything except ASCII letters and periods.
pub fn clean_ocr_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '.')
        .collect()
}

/// Detects images whose top row is mostly the reference color.
#[derive(Debug, Clone)]
pub struct GrayDetector {
    reference: [u8; 3],
    threshold: u32,
    min_ratio: f64,
}

impl GrayDetector {
    pub fn new(reference: [u8; 3], threshold: u32, min_ratio: f64) -> Self {
        Self {
            reference,
            threshold,
            min_ratio,
        }
    }

    pub fn from_config(config: &GrayConfig) -> Self {
        Self::new(config.reference, config.threshold, config.min_ratio)
    }

    /// Squared RGB distance to the reference is below the squared threshold.
    pub fn matches(&self, rgb: [u8; 3]) -> bool {
        let distance: u32 = rgb
            .iter()
            .zip(self.reference.iter())
            .map(|(&a, &b)| {
                let d = u32::from(a.abs_diff(b));
                d * d
            })
            .sum();
        distance < self.threshold * self.threshold
    }

    /// Check the top row (y = 0) of a decoded image.
    pub fn is_correct_gray(&self, image: &DynamicImage) -> bool {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return false;
        }

        let matching = (0..width)
            .filter(|&x| self.matches(image.get_pixel(x, 0).to_rgb().0))
            .count();

        matching as f64 > f64::from(width) * self.min_ratio
    }

    /// Decode `path` and check it. Blocking.
    pub fn detect_file(&self, path: &Path) -> Result<bool> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(self.is_correct_gray(&image))
    }
}

/// Runs all analyses for one file and reduces them to tags.
pub struct Classifier {
    ocr: Arc<dyn OcrEngine>,
    gray: GrayDetector,
    min_text_chars: usize,
    tags: TagConfig,
}

impl Classifier {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        gray: GrayDetector,
        min_text_chars: usize,
        tags: TagConfig,
    ) -> Self {
        Self {
            ocr,
            gray,
            min_text_chars,
            tags,
        }
    }

    pub fn from_config(config: &Config, ocr: Arc<dyn OcrEngine>) -> Self {
        Self::new(
            ocr,
            GrayDetector::from_config(&config.gray),
            config.ocr.min_text_chars,
            config.tags.clone(),
        )
    }

    /// Whether raw OCR output counts as real text.
    ///
    /// Short or noisy output is treated as texture noise.
    pub fn has_text(&self, raw: &str) -> bool {
        clean_ocr_text(raw).len() > self.min_text_chars
    }

    /// Classify a downloaded image.
    ///
    /// OCR failures and decode failures are returned as errors.
    pub async fn classify(&self, item_id: ItemId, path: &Path) -> Result<ClassificationResult> {
        let gray = self.gray.clone();
        let owned = path.to_path_buf();
        let gray_task = tokio::task::spawn_blocking(move || gray.detect_file(&owned));

        let (recognized, correct_gray) = tokio::join!(self.ocr.recognize(path), gray_task);
        let has_text = self.has_text(&recognized?);
        let correct_gray = correct_gray??;

        let mut result = ClassificationResult::empty(item_id);
        result.has_text = has_text;
        result.correct_gray = correct_gray;
        if has_text {
            result.tags.insert(self.tags.text.clone());
        }
        if correct_gray {
            result.tags.insert(self.tags.gray.clone());
        }
        Ok(result)
    }
}
