use std::path::Path;

use crate::error::StorageError;

/// Deletes a pipeline intermediate. A file that is already gone counts as removed.
pub fn remove_intermediate(path: &Path) -> Result<(), StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::RemoveFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
