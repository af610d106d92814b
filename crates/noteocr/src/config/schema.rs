use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite file. Defaults to `~/.noteocr/data/noteocr.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            ocr: OcrConfig::default(),
            preprocessing: PreprocessingConfig::default(),
            tracker: TrackerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    /// The `tesseract` executable.
    #[default]
    Cli,
    /// In-process libtesseract (requires the `tesseract` feature).
    Leptess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default)]
    pub backend: OcrBackend,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_command")]
    pub command: String,
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_command() -> String {
    "tesseract".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Cli,
            languages: default_languages(),
            command: default_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    #[serde(default = "default_sharpen_sigma")]
    pub sharpen_sigma: f32,
    #[serde(default = "default_sharpen_threshold")]
    pub sharpen_threshold: i32,
    #[serde(default = "default_low_percentile")]
    pub low_percentile: f32,
    #[serde(default = "default_high_percentile")]
    pub high_percentile: f32,
}

fn default_sharpen_sigma() -> f32 {
    1.0
}

fn default_sharpen_threshold() -> i32 {
    2
}

fn default_low_percentile() -> f32 {
    1.0
}

fn default_high_percentile() -> f32 {
    99.0
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            sharpen_sigma: default_sharpen_sigma(),
            sharpen_threshold: default_sharpen_threshold(),
            low_percentile: default_low_percentile(),
            high_percentile: default_high_percentile(),
        }
    }
}

/// Bounds for the in-memory job status cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_capacity")]
    pub capacity: u64,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_tracker_capacity() -> u64 {
    10_000
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_broadcast_capacity() -> usize {
    100
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capacity: default_tracker_capacity(),
            ttl_seconds: default_ttl_seconds(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}
