//! Asynchronous entry points: enqueue, retry, poll and subscribe.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::broadcast::{IdleRecord, JobStore, OcrJobStatus};
use crate::config::{resolve_database_path, Config};
use crate::db::Database;
use crate::error::{NoteOcrError, WorkerError};
use crate::pipeline::{Pipeline, PipelineConfig, PipelineError};
use crate::storage::SqliteStore;
use crate::worker::{JobOutcome, OcrJobRequest, WorkerPool};

pub const MSG_QUEUED: &str = "Queued for OCR processing";

/// Owns the pipeline and the worker pool that runs it.
pub struct OcrService {
    pipeline: Arc<Pipeline>,
    pool: WorkerPool,
    store: Option<SqliteStore>,
}

impl OcrService {
    /// Opens the configured database and starts the workers.
    pub fn from_config(config: &Config) -> Result<Self, NoteOcrError> {
        let db_path = resolve_database_path(config)?;
        let db = Database::open(&db_path)?;
        info!("Using database {}", crate::sanitize::redact_path(&db_path));

        let store = SqliteStore::new(db);
        let pipeline = Pipeline::from_config(
            &PipelineConfig::from_config(config),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )?;

        let mut service = Self::new(
            Arc::new(pipeline),
            config.worker_count,
            config.queue_capacity,
        )?;
        service.store = Some(store);
        Ok(service)
    }

    pub fn new(
        pipeline: Arc<Pipeline>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, WorkerError> {
        let pool = WorkerPool::new(Arc::clone(&pipeline), worker_count, queue_capacity)?;
        Ok(Self {
            pipeline,
            pool,
            store: None,
        })
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// The SQLite store, when the service opened one itself.
    pub fn store(&self) -> Option<&SqliteStore> {
        self.store.as_ref()
    }

    /// Queues an OCR run and returns the acknowledgement without waiting.
    pub fn start_job(
        &self,
        file_id: &str,
        file_path: impl Into<PathBuf>,
        owner_id: &str,
        original_file_name: &str,
    ) -> Result<OcrJobStatus, PipelineError> {
        let request = OcrJobRequest::new(file_id, file_path, owner_id, original_file_name);
        self.enqueue(request)
    }

    /// Queues a fresh run of an existing upload.
    ///
    /// Unknown or foreign uploads fail with `NotFound` and leave tracked
    /// state as it was.
    pub fn retry_job(&self, file_id: &str, owner_id: &str) -> Result<OcrJobStatus, PipelineError> {
        let request = self.pipeline.lookup_retry(file_id, owner_id)?;
        info!("Retrying OCR processing for file: {}", file_id);
        self.enqueue(request)
    }

    /// Read-only poll of a job.
    pub fn get_status(&self, file_id: &str) -> Result<OcrJobStatus, PipelineError> {
        self.pipeline.status(file_id)
    }

    /// Receives every status the tracker records from now on.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<OcrJobStatus>> {
        self.tracker().broadcaster().map(|b| b.subscribe())
    }

    pub fn tracker(&self) -> &Arc<JobStore> {
        self.pipeline.tracker()
    }

    /// Next finished job, if one is ready.
    pub fn try_recv_outcome(&self) -> Option<JobOutcome> {
        self.pool.try_recv_result()
    }

    pub fn recv_outcome_timeout(&self, timeout: Duration) -> Option<JobOutcome> {
        self.pool.recv_result_timeout(timeout)
    }

    pub fn pending(&self) -> usize {
        self.pool.pending()
    }

    /// Lets workers finish queued jobs, then joins them.
    pub fn drain(self) {
        self.pool.wait();
    }

    /// Stops after in-flight jobs.
    ///
    /// Queued jobs are abandoned and their queued acknowledgement is dropped
    /// from the tracker, so polls report the durable file status again.
    pub fn shutdown(self) {
        self.pool.shutdown();
        let tracker = Arc::clone(self.pipeline.tracker());
        for job in self.pool.wait() {
            if tracker.remove_if_unfinished(&job.file_id) {
                warn!("Abandoned queued OCR job {}", job.file_id);
            }
        }
    }

    /// Submits `request` and returns its queued acknowledgement.
    ///
    /// The acknowledgement is only recorded when no run of the same id is
    /// active or tracked as unfinished. A rejected submission rolls the
    /// tracker back only if it still holds that acknowledgement.
    fn enqueue(&self, request: OcrJobRequest) -> Result<OcrJobStatus, PipelineError> {
        let tracker = self.tracker();
        let ack = OcrJobStatus::processing(&request.file_id, 0, MSG_QUEUED, Utc::now());

        let recorded = if self.pipeline.is_running(&request.file_id) {
            IdleRecord::Busy
        } else {
            tracker.record_if_idle(&ack)
        };
        if recorded == IdleRecord::Busy {
            debug!("OCR job {} already active, queued ack not recorded", ack.id);
        }

        let file_id = request.file_id.clone();
        if let Err(e) = self.pool.submit(request) {
            warn!("Could not queue OCR job {}: {}", file_id, e);
            if let IdleRecord::Recorded(previous) = recorded {
                tracker.restore_if_current(&ack, previous);
            }
            return Err(PipelineError::Queue(e));
        }

        debug!("Queued OCR job {} ({} pending)", file_id, self.pool.pending());
        Ok(ack)
    }
}
