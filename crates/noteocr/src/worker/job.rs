use std::path::PathBuf;

use crate::broadcast::OcrJobStatus;
use crate::pipeline::PipelineError;

/// A request to OCR one uploaded file. The file id doubles as the job id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrJobRequest {
    pub file_id: String,
    pub file_path: PathBuf,
    pub owner_id: String,
    pub original_file_name: String,
}

impl OcrJobRequest {
    pub fn new(
        file_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        owner_id: impl Into<String>,
        original_file_name: impl Into<String>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            file_path: file_path.into(),
            owner_id: owner_id.into(),
            original_file_name: original_file_name.into(),
        }
    }
}

/// What a worker reports after running one job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub success: bool,
    pub document_id: Option<String>,
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn success(status: &OcrJobStatus) -> Self {
        Self {
            job_id: status.id.clone(),
            success: true,
            document_id: status.document_id.clone(),
            error: None,
        }
    }

    pub fn failure(job_id: &str, error: &PipelineError) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: false,
            document_id: None,
            error: Some(error.to_string()),
        }
    }

    pub fn from_result(job_id: &str, result: &Result<OcrJobStatus, PipelineError>) -> Self {
        match result {
            Ok(status) => Self::success(status),
            Err(e) => Self::failure(job_id, e),
        }
    }
}
