use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn};

use crate::broadcast::{JobProgressBroadcaster, JobStatus, JobStore, OcrJobStatus};
use crate::error::ProcessError;
use crate::processor::{build_engine, ImagePreprocessor, ImageTransform, TextExtractor};
use crate::sanitize;
use crate::storage::{self, DocumentStore, DocumentType, FileStore, NewDocument};
use crate::worker::job::OcrJobRequest;

use super::config::PipelineConfig;
use super::context::{PipelineContext, MSG_COMPLETED, MSG_EXTRACTED, MSG_PREPROCESSED};
use super::error::PipelineError;
use super::locks::JobLocks;
use super::title::derive_document_title;

pub struct Pipeline {
    preprocessor: Arc<dyn ImageTransform>,
    extractor: TextExtractor,
    files: Arc<dyn FileStore>,
    documents: Arc<dyn DocumentStore>,
    tracker: Arc<JobStore>,
    locks: JobLocks,
}

impl Pipeline {
    /// Builds the stages and a broadcasting tracker from config.
    pub fn from_config(
        config: &PipelineConfig,
        files: Arc<dyn FileStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Result<Self, ProcessError> {
        let engine = build_engine(&config.ocr)?;
        let tracker = JobStore::new(
            config.tracker_capacity,
            config.tracker_ttl,
            Arc::clone(&files),
        )
        .with_broadcaster(JobProgressBroadcaster::new(config.broadcast_capacity));

        Ok(Self::new(
            Arc::new(ImagePreprocessor::new(&config.preprocessing)),
            TextExtractor::new(engine),
            files,
            documents,
            Arc::new(tracker),
        ))
    }

    /// Assembles a pipeline from explicit stages.
    pub fn new(
        preprocessor: Arc<dyn ImageTransform>,
        extractor: TextExtractor,
        files: Arc<dyn FileStore>,
        documents: Arc<dyn DocumentStore>,
        tracker: Arc<JobStore>,
    ) -> Self {
        Self {
            preprocessor,
            extractor,
            files,
            documents,
            tracker,
            locks: JobLocks::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<JobStore> {
        &self.tracker
    }

    pub fn files(&self) -> &Arc<dyn FileStore> {
        &self.files
    }

    /// Runs the full pipeline for one upload and returns the final tracked state.
    ///
    /// Runs for the same file id are serialized; the second waits for the
    /// first to reach a terminal state. Every stage blocks the calling thread,
    /// so async callers should go through `spawn_blocking` or the worker pool.
    pub fn run(&self, request: &OcrJobRequest) -> Result<OcrJobStatus, PipelineError> {
        let _lock = self.locks.lock(&request.file_id);

        let filename = sanitize::redact_path(Path::new(&request.original_file_name));
        let _pipeline_span = info_span!("pipeline",
            job_id = %request.file_id,
            filename = %filename,
            owner = %sanitize::hash_id(&request.owner_id),
        )
        .entered();

        info!("Starting OCR processing for file: {}", request.file_id);

        let mut ctx = PipelineContext::new(request.clone(), Utc::now());
        self.tracker.record(&ctx.status);

        // Step 0: Mark the upload as processing
        if let Err(e) = self.step_mark_processing(&ctx) {
            return Err(self.fail(&mut ctx, e));
        }

        // Step 1: Preprocess image
        {
            let _step = info_span!("preprocess").entered();
            if let Err(e) = self.step_preprocess(&mut ctx) {
                return Err(self.fail(&mut ctx, e));
            }
            ctx.status.advance(25, MSG_PREPROCESSED);
            self.tracker.record(&ctx.status);
        }

        // Step 2: Extract text
        {
            let _step = info_span!("extract_text").entered();
            if let Err(e) = self.step_extract(&mut ctx) {
                return Err(self.fail(&mut ctx, e));
            }
            ctx.status.advance(75, MSG_EXTRACTED);
            self.tracker.record(&ctx.status);
        }

        // Step 3: Create document
        {
            let _step = info_span!("materialize").entered();
            if let Err(e) = self.step_materialize(&mut ctx) {
                return Err(self.fail(&mut ctx, e));
            }
        }

        Ok(self.finish(&mut ctx))
    }

    /// Whether a run for `job_id` is in progress or waiting to start.
    pub fn is_running(&self, job_id: &str) -> bool {
        self.locks.is_held(job_id)
    }

    /// Re-runs a job from the durable upload record.
    ///
    /// Fails with `NotFound` without touching tracked state when the upload
    /// does not exist or belongs to someone else.
    pub fn retry(&self, file_id: &str, owner_id: &str) -> Result<OcrJobStatus, PipelineError> {
        let request = self.lookup_retry(file_id, owner_id)?;
        info!("Retrying OCR processing for file: {}", file_id);
        self.run(&request)
    }

    /// Resolves the request a retry would run.
    pub fn lookup_retry(
        &self,
        file_id: &str,
        owner_id: &str,
    ) -> Result<OcrJobRequest, PipelineError> {
        let record = self
            .files
            .find_file_by_id(file_id)
            .map_err(PipelineError::Lookup)?;

        match record {
            Some(file) if file.owner_id == owner_id => Ok(OcrJobRequest::new(
                file.id,
                file.file_path,
                file.owner_id,
                file.original_name,
            )),
            _ => {
                debug!("Retry rejected for file {}", file_id);
                Err(PipelineError::NotFound(file_id.to_string()))
            }
        }
    }

    /// Current state of a job, falling back to the durable upload status.
    pub fn status(&self, job_id: &str) -> Result<OcrJobStatus, PipelineError> {
        self.tracker
            .read_status(job_id)
            .map_err(PipelineError::Lookup)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))
    }

    fn step_mark_processing(&self, ctx: &PipelineContext) -> Result<(), PipelineError> {
        self.files
            .update_file_status(ctx.job_id(), JobStatus::Processing)
            .map_err(PipelineError::StatusUpdate)
    }

    fn step_preprocess(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let output = self
            .preprocessor
            .preprocess(&ctx.request.file_path, &ctx.request.file_id)
            .map_err(PipelineError::Preprocessing)?;
        debug!("Preprocessed image: {}", sanitize::redact_path(&output));
        ctx.preprocessed_path = Some(output);
        Ok(())
    }

    fn step_extract(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let image = match ctx.preprocessed_path {
            Some(ref path) => path.clone(),
            None => ctx.request.file_path.clone(),
        };
        let text = self
            .extractor
            .extract(&image)
            .map_err(PipelineError::Extraction)?;
        debug!("Text extraction completed. Length: {} characters", text.len());
        ctx.text = Some(text);
        Ok(())
    }

    fn step_materialize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let document = NewDocument {
            title: derive_document_title(&ctx.request.original_file_name),
            content: ctx.text.take().unwrap_or_default(),
            document_type: DocumentType::OcrProcessed,
            original_file_name: Some(ctx.request.original_file_name.clone()),
        };

        let created = self
            .documents
            .create_document(&ctx.request.owner_id, document)
            .map_err(PipelineError::Materialization)?;

        debug!("Document created from OCR: {}", created.id);
        ctx.document = Some(created);
        Ok(())
    }

    fn finish(&self, ctx: &mut PipelineContext) -> OcrJobStatus {
        let document_id = ctx
            .document
            .as_ref()
            .map(|d| d.id.clone())
            .unwrap_or_default();
        ctx.status.complete(&document_id, MSG_COMPLETED);
        self.tracker.record(&ctx.status);

        if let Err(e) = self
            .files
            .update_file_status(ctx.job_id(), JobStatus::Processed)
        {
            error!(
                "Failed to persist PROCESSED status for file {}: {}",
                ctx.job_id(),
                e
            );
        }

        self.cleanup_intermediate(ctx);

        info!("OCR processing completed successfully for file: {}", ctx.job_id());
        ctx.status.clone()
    }

    /// Records the failure, mirrors it durably and hands the error back.
    fn fail(&self, ctx: &mut PipelineContext, err: PipelineError) -> PipelineError {
        error!("OCR processing failed for file {}: {}", ctx.job_id(), err);

        ctx.status.fail(format!("OCR processing failed: {}", err));
        self.tracker.record(&ctx.status);

        if let Err(e) = self
            .files
            .update_file_status(ctx.job_id(), JobStatus::Failed)
        {
            error!(
                "Failed to persist FAILED status for file {}: {}",
                ctx.job_id(),
                e
            );
        }

        self.cleanup_intermediate(ctx);
        err
    }

    fn cleanup_intermediate(&self, ctx: &mut PipelineContext) {
        if let Some(path) = ctx.preprocessed_path.take() {
            if let Err(e) = storage::remove_intermediate(&path) {
                warn!("Failed to clean up preprocessed image: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::processor::{OcrEngine, OcrSession};
    use crate::storage::SqliteStore;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Copies the input to the expected intermediate path.
    struct CopyTransform;

    impl ImageTransform for CopyTransform {
        fn preprocess(&self, input: &Path, job_id: &str) -> Result<PathBuf, ProcessError> {
            let out = crate::processor::preprocess::intermediate_path(input, job_id);
            std::fs::copy(input, &out)
                .map_err(|e| ProcessError::Preprocessing(e.to_string()))?;
            Ok(out)
        }
    }

    struct FixedEngine(&'static str);

    impl OcrEngine for FixedEngine {
        fn open(&self) -> Result<Box<dyn OcrSession>, ProcessError> {
            Ok(Box::new(FixedSession(self.0)))
        }
    }

    struct FixedSession(&'static str);

    impl OcrSession for FixedSession {
        fn recognize(&mut self, _image: &Path) -> Result<String, ProcessError> {
            Ok(self.0.to_string())
        }
    }

    fn setup(text: &'static str) -> (TempDir, SqliteStore, Pipeline) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(Database::open_in_memory().unwrap());
        let files: Arc<dyn FileStore> = Arc::new(store.clone());
        let tracker = Arc::new(JobStore::new(
            100,
            Duration::from_secs(60),
            Arc::clone(&files),
        ));
        let pipeline = Pipeline::new(
            Arc::new(CopyTransform),
            TextExtractor::new(Arc::new(FixedEngine(text))),
            files,
            Arc::new(store.clone()),
            tracker,
        );
        (dir, store, pipeline)
    }

    fn upload(dir: &TempDir, store: &SqliteStore, name: &str) -> OcrJobRequest {
        let path = dir.path().join(name);
        std::fs::write(&path, b"raw image bytes").unwrap();
        let record = store.register_upload("owner-1", &path, name).unwrap();
        OcrJobRequest::new(record.id, path, "owner-1", name)
    }

    #[test]
    fn test_run_success() {
        let (dir, store, pipeline) = setup("Photosynthesis   notes\n\n\n\nChlorophyll");
        let request = upload(&dir, &store, "bio_ch-2.png");

        let status = pipeline.run(&request).unwrap();

        assert_eq!(status.status, JobStatus::Processed);
        assert_eq!(status.progress, Some(100));
        assert_eq!(status.message.as_deref(), Some(MSG_COMPLETED));

        let doc_id = status.document_id.clone().unwrap();
        let doc = store.find_document(&doc_id).unwrap().unwrap();
        assert_eq!(doc.title, "Bio Ch 2 (OCR)");
        assert_eq!(doc.content, "Photosynthesis notes\n\nChlorophyll");
        assert_eq!(doc.document_type, DocumentType::OcrProcessed);
        assert_eq!(doc.original_file_name.as_deref(), Some("bio_ch-2.png"));

        let file = store.find_file_by_id(&request.file_id).unwrap().unwrap();
        assert_eq!(file.status, JobStatus::Processed);

        assert_eq!(pipeline.tracker().get(&request.file_id), Some(status));
        assert!(!crate::processor::preprocess::intermediate_path(
            &request.file_path,
            &request.file_id
        )
        .exists());
    }

    #[test]
    fn test_run_missing_upload_fails_status_update() {
        let (dir, _store, pipeline) = setup("text");
        let path = dir.path().join("orphan.png");
        std::fs::write(&path, b"x").unwrap();
        let request = OcrJobRequest::new("no-such-file", path, "owner-1", "orphan.png");

        let err = pipeline.run(&request).unwrap_err();
        assert!(matches!(err, PipelineError::StatusUpdate(_)));

        let tracked = pipeline.tracker().get("no-such-file").unwrap();
        assert_eq!(tracked.status, JobStatus::Failed);
        assert_eq!(tracked.progress, Some(0));
        assert!(tracked
            .message
            .unwrap()
            .starts_with("OCR processing failed: Failed to update file status"));
    }

    #[test]
    fn test_status_unknown_job() {
        let (_dir, _store, pipeline) = setup("text");
        let err = pipeline.status("ghost").unwrap_err();
        assert!(matches!(err, PipelineError::JobNotFound(id) if id == "ghost"));
    }

    #[test]
    fn test_lookup_retry_checks_owner() {
        let (dir, store, pipeline) = setup("text");
        let request = upload(&dir, &store, "a.png");

        let resolved = pipeline.lookup_retry(&request.file_id, "owner-1").unwrap();
        assert_eq!(resolved, request);

        let err = pipeline
            .lookup_retry(&request.file_id, "intruder")
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
        assert!(pipeline.tracker().get(&request.file_id).is_none());
    }

    #[tokio::test]
    async fn test_run_inside_async_runtime() {
        let (dir, store, pipeline) = setup("async caller");
        let request = upload(&dir, &store, "async.png");

        let status = pipeline.run(&request).unwrap();
        assert_eq!(status.status, JobStatus::Processed);
        assert!(!pipeline.is_running(&request.file_id));
    }
}
