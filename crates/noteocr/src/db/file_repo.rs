//! CRUD operations for the `uploaded_files` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw uploaded-file row from the database.
#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: String,
    pub owner_id: String,
    pub file_path: String,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl FileRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            file_path: row.get("file_path")?,
            original_name: row.get("original_name")?,
            mime_type: row.get("mime_type")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new uploaded-file row.
pub fn insert(db: &Database, file: &FileRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO uploaded_files (id, owner_id, file_path, original_name, mime_type,
             status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                file.id,
                file.owner_id,
                file.file_path,
                file.original_name,
                file.mime_type,
                file.status,
                file.created_at,
                file.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds an uploaded file by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<FileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM uploaded_files WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], FileRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Updates only the status and updated_at of a file. Returns the number of
/// rows touched, so callers can tell a missing id apart from a no-op.
pub fn update_status(
    db: &Database,
    id: &str,
    status: &str,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE uploaded_files SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status, updated_at],
        )?;
        Ok(changed)
    })
}

/// Counts files with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM uploaded_files WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
