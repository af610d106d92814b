pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod service;
pub mod storage;
pub mod worker;

pub use broadcast::{JobProgressBroadcaster, JobStatus, JobStore, OcrJobStatus};
pub use config::{load_config, Config};
pub use error::{ConfigError, NoteOcrError, ProcessError, Result, StorageError, WorkerError};
pub use logging::init_logging;
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext, PipelineError};
pub use service::OcrService;
pub use storage::{DocumentStore, FileStore, SqliteStore};
pub use worker::{OcrJobRequest, WorkerPool};
