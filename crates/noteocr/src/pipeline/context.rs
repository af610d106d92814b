use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::broadcast::OcrJobStatus;
use crate::storage::CreatedDocument;
use crate::worker::job::OcrJobRequest;

pub const MSG_STARTING: &str = "Starting OCR processing...";
pub const MSG_PREPROCESSED: &str = "Image preprocessed, starting text extraction...";
pub const MSG_EXTRACTED: &str = "Text extracted, creating document...";
pub const MSG_COMPLETED: &str = "OCR processing completed successfully";

pub struct PipelineContext {
    // Input
    pub request: OcrJobRequest,

    // Tracked state, recorded after every step
    pub status: OcrJobStatus,

    // Step 1 result, deleted on completion or failure
    pub preprocessed_path: Option<PathBuf>,

    // Step 2 result
    pub text: Option<String>,

    // Step 3 result
    pub document: Option<CreatedDocument>,
}

impl PipelineContext {
    pub fn new(request: OcrJobRequest, started_at: DateTime<Utc>) -> Self {
        let status = OcrJobStatus::processing(&request.file_id, 0, MSG_STARTING, started_at);
        Self {
            request,
            status,
            preprocessed_path: None,
            text: None,
            document: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.request.file_id
    }
}
