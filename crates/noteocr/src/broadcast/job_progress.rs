//! Job status types and the progress broadcaster for real-time streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Status of an OCR job. Mirrors the durable status stored on the upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
}

impl JobStatus {
    /// Wire and storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "UPLOADED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Processed => "PROCESSED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Parses the storage representation. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPLOADED" => Some(JobStatus::Uploaded),
            "PROCESSING" => Some(JobStatus::Processing),
            "PROCESSED" => Some(JobStatus::Processed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Whether the status is terminal (`Processed` or `Failed`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Processed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Poll-able view of one OCR job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OcrJobStatus {
    /// Job identifier (the uploaded file's id).
    pub id: String,
    /// Current status.
    pub status: JobStatus,
    /// Progress percentage, 0-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Human-readable description of the current activity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Produced document (set once processed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// When the current run (or the durable record) was created.
    pub created_at: DateTime<Utc>,
}

impl OcrJobStatus {
    /// Creates a `Processing` status at the given progress.
    pub fn processing(id: &str, progress: u8, message: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            status: JobStatus::Processing,
            progress: Some(progress),
            message: Some(message.to_string()),
            document_id: None,
            created_at,
        }
    }

    /// Advances a `Processing` status to a new progress step.
    pub fn advance(&mut self, progress: u8, message: &str) {
        self.status = JobStatus::Processing;
        self.progress = Some(progress);
        self.message = Some(message.to_string());
    }

    /// Marks the job processed with the produced document.
    pub fn complete(&mut self, document_id: &str, message: &str) {
        self.status = JobStatus::Processed;
        self.progress = Some(100);
        self.message = Some(message.to_string());
        self.document_id = Some(document_id.to_string());
    }

    /// Marks the job failed. Progress keeps the last reached step.
    pub fn fail(&mut self, message: String) {
        self.status = JobStatus::Failed;
        self.message = Some(message);
    }
}

/// Broadcasts job status changes for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<OcrJobStatus>>,
}

impl JobProgressBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a status to all subscribers.
    pub fn send(&self, status: OcrJobStatus) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(status);
    }

    /// Creates a new subscriber for status events.
    pub fn subscribe(&self) -> broadcast::Receiver<OcrJobStatus> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
