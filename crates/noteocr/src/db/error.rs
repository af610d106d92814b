use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create database directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// The file was written by a build with newer migrations.
    #[error("Database schema v{found} is newer than supported v{supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    /// A stored enum column holds a value this build cannot read.
    #[error("Invalid {column} '{value}' in {table} row {id}")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        id: String,
        value: String,
    },

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}
