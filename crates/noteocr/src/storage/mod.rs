//! Durable storage seams consumed by the pipeline.
//!
//! The pipeline only talks to [`FileStore`] and [`DocumentStore`]; the
//! SQLite-backed [`SqliteStore`] implements both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broadcast::JobStatus;
use crate::error::StorageError;

pub mod filesystem;
pub mod sqlite;

pub use filesystem::remove_intermediate;
pub use sqlite::SqliteStore;

/// Durable record of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFileRecord {
    pub id: String,
    pub owner_id: String,
    pub file_path: String,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Provenance tag of a document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    OcrProcessed,
    Created,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::OcrProcessed => "OCR_PROCESSED",
            DocumentType::Created => "CREATED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OCR_PROCESSED" => Some(DocumentType::OcrProcessed),
            "CREATED" => Some(DocumentType::Created),
            _ => None,
        }
    }
}

/// Input for creating a document.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub document_type: DocumentType,
    pub original_file_name: Option<String>,
}

/// A persisted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDocument {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub document_type: DocumentType,
    pub original_file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Lookup and status updates for uploaded files.
pub trait FileStore: Send + Sync {
    /// Returns the record, or `None` if no upload has this id.
    fn find_file_by_id(&self, id: &str) -> Result<Option<UploadedFileRecord>, StorageError>;

    /// Persists a new durable status. Fails with `FileNotFound` for unknown ids.
    fn update_file_status(&self, id: &str, status: JobStatus) -> Result<(), StorageError>;
}

/// Creates documents on behalf of an owner.
pub trait DocumentStore: Send + Sync {
    fn create_document(
        &self,
        owner_id: &str,
        document: NewDocument,
    ) -> Result<CreatedDocument, StorageError>;
}
