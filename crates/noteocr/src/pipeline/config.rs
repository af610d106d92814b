use std::time::Duration;

use crate::config::schema::{OcrConfig, PreprocessingConfig};
use crate::config::Config;

pub struct PipelineConfig {
    pub ocr: OcrConfig,
    pub preprocessing: PreprocessingConfig,
    pub tracker_capacity: u64,
    pub tracker_ttl: Duration,
    pub broadcast_capacity: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ocr: config.ocr.clone(),
            preprocessing: config.preprocessing.clone(),
            tracker_capacity: config.tracker.capacity,
            tracker_ttl: Duration::from_secs(config.tracker.ttl_seconds),
            broadcast_capacity: config.tracker.broadcast_capacity,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
