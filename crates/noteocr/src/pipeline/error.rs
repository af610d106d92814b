use thiserror::Error;

use crate::error::{ProcessError, StorageError, WorkerError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Preprocessing(ProcessError),

    #[error(transparent)]
    Extraction(ProcessError),

    #[error("Document creation failed: {0}")]
    Materialization(#[source] StorageError),

    #[error("Failed to update file status: {0}")]
    StatusUpdate(#[source] StorageError),

    #[error("OCR job not found: {0}")]
    JobNotFound(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to queue OCR job: {0}")]
    Queue(#[from] WorkerError),

    #[error("Failed to read job status: {0}")]
    Lookup(#[source] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_errors_keep_cause_text() {
        let err = PipelineError::Preprocessing(ProcessError::Preprocessing("bad header".into()));
        assert_eq!(err.to_string(), "Image preprocessing failed: bad header");

        let err = PipelineError::Extraction(ProcessError::OcrFailed("no text layer".into()));
        assert_eq!(err.to_string(), "Text extraction failed: no text layer");
    }

    #[test]
    fn test_lookup_messages() {
        assert_eq!(
            PipelineError::JobNotFound("f9".into()).to_string(),
            "OCR job not found: f9"
        );
        assert_eq!(
            PipelineError::NotFound("f9".into()).to_string(),
            "File not found: f9"
        );
    }

    #[test]
    fn test_queue_full_message() {
        let err: PipelineError = WorkerError::QueueFull { capacity: 4 }.into();
        assert_eq!(
            err.to_string(),
            "Failed to queue OCR job: Job queue is full (4 pending jobs)"
        );
    }
}
