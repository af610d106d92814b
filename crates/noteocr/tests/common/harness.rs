//! Test harness for isolated pipeline runs.
//!
//! Each `TestHarness` owns a temporary upload directory, an in-memory
//! database and a pipeline built from the real image preprocessor plus a
//! scripted OCR engine.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{GrayImage, Luma};
use tempfile::TempDir;

use noteocr::broadcast::{JobProgressBroadcaster, JobStore};
use noteocr::db::Database;
use noteocr::pipeline::Pipeline;
use noteocr::processor::preprocess::intermediate_path;
use noteocr::processor::{ImagePreprocessor, TextExtractor};
use noteocr::storage::{DocumentStore, FileStore, SqliteStore};
use noteocr::worker::OcrJobRequest;

use super::fakes::{FailingDocumentStore, ScriptedEngine};

pub const OWNER: &str = "owner-1";

pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
    pub store: SqliteStore,
    pub engine: ScriptedEngine,
    pub pipeline: Arc<Pipeline>,
}

impl TestHarness {
    /// Pipeline whose OCR always returns `text`.
    pub fn new(text: &str) -> Self {
        Self::with_engine(ScriptedEngine::returning(text))
    }

    pub fn with_engine(engine: ScriptedEngine) -> Self {
        Self::build(engine, None)
    }

    /// Pipeline whose document store always fails.
    pub fn with_failing_documents(text: &str) -> Self {
        Self::build(
            ScriptedEngine::returning(text),
            Some(Arc::new(FailingDocumentStore)),
        )
    }

    fn build(engine: ScriptedEngine, documents: Option<Arc<dyn DocumentStore>>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let upload_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("Failed to create upload dir");

        let store = SqliteStore::new(Database::open_in_memory().expect("Failed to open database"));
        let files: Arc<dyn FileStore> = Arc::new(store.clone());
        let documents = documents.unwrap_or_else(|| Arc::new(store.clone()));

        let tracker = JobStore::new(1_000, Duration::from_secs(300), Arc::clone(&files))
            .with_broadcaster(JobProgressBroadcaster::new(256));

        let pipeline = Pipeline::new(
            Arc::new(ImagePreprocessor::default()),
            TextExtractor::new(Arc::new(engine.clone())),
            files,
            documents,
            Arc::new(tracker),
        );

        Self {
            temp_dir,
            upload_dir,
            store,
            engine,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Writes a small grayscale gradient and registers it as an upload.
    pub fn upload_png(&self, name: &str) -> OcrJobRequest {
        let path = self.upload_dir.join(name);
        let img = GrayImage::from_fn(48, 32, |x, y| Luma([(40 + x * 3 + y) as u8]));
        img.save_with_format(&path, image::ImageFormat::Png)
            .expect("Failed to write test image");
        self.register(&path, name)
    }

    /// Registers an upload with arbitrary file contents.
    pub fn upload_bytes(&self, name: &str, bytes: &[u8]) -> OcrJobRequest {
        let path = self.upload_dir.join(name);
        std::fs::write(&path, bytes).expect("Failed to write upload");
        self.register(&path, name)
    }

    fn register(&self, path: &Path, name: &str) -> OcrJobRequest {
        let record = self
            .store
            .register_upload(OWNER, path, name)
            .expect("Failed to register upload");
        OcrJobRequest::new(record.id, path, OWNER, name)
    }

    /// Where the preprocessor writes its output for `request`.
    pub fn intermediate_for(&self, request: &OcrJobRequest) -> PathBuf {
        intermediate_path(&request.file_path, &request.file_id)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
