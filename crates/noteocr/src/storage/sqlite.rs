//! SQLite-backed implementation of the storage seams.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::broadcast::JobStatus;
use crate::db::document_repo::{self, DocumentRow};
use crate::db::file_repo::{self, FileRow};
use crate::db::{Database, DatabaseError};
use crate::error::StorageError;

use super::{
    CreatedDocument, DocumentStore, DocumentType, FileStore, NewDocument, UploadedFileRecord,
};

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn invalid(table: &'static str, column: &'static str, id: &str, value: &str) -> StorageError {
    StorageError::Database(DatabaseError::InvalidValue {
        table,
        column,
        id: id.to_string(),
        value: value.to_string(),
    })
}

fn record_from_row(row: FileRow) -> Result<UploadedFileRecord, StorageError> {
    let status = JobStatus::parse(&row.status)
        .ok_or_else(|| invalid("uploaded_files", "status", &row.id, &row.status))?;
    Ok(UploadedFileRecord {
        created_at: parse_timestamp(&row.created_at),
        status,
        id: row.id,
        owner_id: row.owner_id,
        file_path: row.file_path,
        original_name: row.original_name,
        mime_type: row.mime_type,
    })
}

fn document_from_row(row: DocumentRow) -> Result<CreatedDocument, StorageError> {
    let document_type = DocumentType::parse(&row.document_type)
        .ok_or_else(|| invalid("documents", "document_type", &row.id, &row.document_type))?;
    Ok(CreatedDocument {
        created_at: parse_timestamp(&row.created_at),
        document_type,
        id: row.id,
        owner_id: row.owner_id,
        title: row.title,
        content: row.content,
        original_file_name: row.original_file_name,
    })
}

/// Durable file and document store over a shared [`Database`].
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Registers an uploaded file with status `UPLOADED` and returns its record.
    ///
    /// The MIME type is guessed from the original name's extension.
    pub fn register_upload(
        &self,
        owner_id: &str,
        file_path: &Path,
        original_name: &str,
    ) -> Result<UploadedFileRecord, StorageError> {
        let now = Utc::now();
        let row = FileRow {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            file_path: file_path.to_string_lossy().into_owned(),
            original_name: original_name.to_string(),
            mime_type: mime_guess::from_path(original_name)
                .first()
                .map(|m| m.essence_str().to_string()),
            status: JobStatus::Uploaded.as_str().to_string(),
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };
        file_repo::insert(&self.db, &row)?;

        log::debug!("Registered upload {} for owner {}", row.id, owner_id);
        record_from_row(row)
    }

    /// Looks up a previously created document.
    pub fn find_document(&self, id: &str) -> Result<Option<CreatedDocument>, StorageError> {
        document_repo::find_by_id(&self.db, id)?
            .map(document_from_row)
            .transpose()
    }

    /// Lists an owner's documents, newest first.
    pub fn documents_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<CreatedDocument>, StorageError> {
        document_repo::list_by_owner(&self.db, owner_id)?
            .into_iter()
            .map(document_from_row)
            .collect()
    }
}

impl FileStore for SqliteStore {
    fn find_file_by_id(&self, id: &str) -> Result<Option<UploadedFileRecord>, StorageError> {
        file_repo::find_by_id(&self.db, id)?
            .map(record_from_row)
            .transpose()
    }

    fn update_file_status(&self, id: &str, status: JobStatus) -> Result<(), StorageError> {
        let changed =
            file_repo::update_status(&self.db, id, status.as_str(), &Utc::now().to_rfc3339())?;
        if changed == 0 {
            return Err(StorageError::FileNotFound(id.to_string()));
        }
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn create_document(
        &self,
        owner_id: &str,
        document: NewDocument,
    ) -> Result<CreatedDocument, StorageError> {
        let row = DocumentRow {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: document.title,
            content: document.content,
            document_type: document.document_type.as_str().to_string(),
            original_file_name: document.original_file_name,
            created_at: Utc::now().to_rfc3339(),
        };
        document_repo::insert(&self.db, &row)?;
        document_from_row(row)
    }
}
