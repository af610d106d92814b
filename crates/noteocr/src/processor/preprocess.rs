//! Image normalization ahead of OCR.
//!
//! Grayscale, percentile contrast stretch, unsharp mask, lossless PNG.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat, Luma};

use crate::config::schema::PreprocessingConfig;
use crate::error::ProcessError;
use crate::sanitize;
use crate::storage;

/// Turns an input image into an OCR-ready file.
pub trait ImageTransform: Send + Sync {
    /// Writes the normalized image next to `input` and returns its path.
    fn preprocess(&self, input: &Path, job_id: &str) -> Result<PathBuf, ProcessError>;
}

/// Saves `img` as PNG at `output`. A partial file is removed on failure.
fn write_intermediate(img: &GrayImage, output: &Path) -> Result<(), ProcessError> {
    img.save_with_format(output, ImageFormat::Png).map_err(|e| {
        if let Err(cleanup) = storage::remove_intermediate(output) {
            log::warn!("Failed to remove partial intermediate: {}", cleanup);
        }
        ProcessError::Preprocessing(format!(
            "Failed to write '{}': {}",
            sanitize::redact_path(output),
            e
        ))
    })
}

/// Path of the intermediate written for `job_id` next to `input`.
pub fn intermediate_path(input: &Path, job_id: &str) -> PathBuf {
    let name = format!("preprocessed_{}.png", sanitize::file_safe_id(job_id));
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    sharpen_sigma: f32,
    sharpen_threshold: i32,
    low_percentile: f32,
    high_percentile: f32,
}

impl ImagePreprocessor {
    pub fn new(config: &PreprocessingConfig) -> Self {
        Self {
            sharpen_sigma: config.sharpen_sigma,
            sharpen_threshold: config.sharpen_threshold,
            low_percentile: config.low_percentile,
            high_percentile: config.high_percentile,
        }
    }

    /// Runs the in-memory part of the transform.
    pub fn normalize(&self, gray: &GrayImage) -> GrayImage {
        let stretched = stretch_contrast(gray, self.low_percentile, self.high_percentile);
        image::imageops::unsharpen(&stretched, self.sharpen_sigma, self.sharpen_threshold)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(&PreprocessingConfig::default())
    }
}

impl ImageTransform for ImagePreprocessor {
    fn preprocess(&self, input: &Path, job_id: &str) -> Result<PathBuf, ProcessError> {
        let _span = tracing::info_span!(
            "processor.preprocess",
            file = %sanitize::redact_path(input)
        )
        .entered();

        let img = image::open(input).map_err(|e| {
            ProcessError::Preprocessing(format!(
                "Failed to read image '{}': {}",
                sanitize::redact_path(input),
                e
            ))
        })?;

        let gray = img.to_luma8();
        let normalized = self.normalize(&gray);

        let output = intermediate_path(input, job_id);
        write_intermediate(&normalized, &output)?;

        log::debug!(
            "Preprocessed {} ({}x{}) into {}",
            sanitize::redact_path(input),
            normalized.width(),
            normalized.height(),
            sanitize::redact_path(&output)
        );

        Ok(output)
    }
}

/// Smallest luminance value whose cumulative share reaches `percentile`.
fn percentile_value(histogram: &[u64; 256], total: u64, percentile: f32) -> u8 {
    let target = ((total as f64) * f64::from(percentile) / 100.0).ceil().max(1.0) as u64;
    let mut cumulative = 0u64;
    for (value, count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return value as u8;
        }
    }
    255
}

/// Linearly maps the `[low, high]` percentile range onto 0-255.
///
/// Images whose cut-offs coincide are returned unchanged.
pub fn stretch_contrast(img: &GrayImage, low_percentile: f32, high_percentile: f32) -> GrayImage {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total = u64::from(img.width()) * u64::from(img.height());
    if total == 0 {
        return img.clone();
    }

    let low = percentile_value(&histogram, total, low_percentile);
    let high = percentile_value(&histogram, total, high_percentile);
    if high <= low {
        return img.clone();
    }

    let range = f32::from(high - low);
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let v = value as f32;
        let scaled = ((v - f32::from(low)) / range * 255.0).round();
        *slot = scaled.clamp(0.0, 255.0) as u8;
    }

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        *pixel = Luma([lut[pixel[0] as usize]]);
    }
    out
}
