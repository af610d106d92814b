//! Helpers for sanitizing data before it enters tracing span attributes
//! or file names.
//!
//! Traces are safe to share for debugging: upload directories and owner
//! identifiers never appear in spans verbatim.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Returns a short deterministic hash of an identifier for correlation
/// without exposing it.
pub fn hash_id(id: &str) -> String {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Makes an identifier safe to embed in a file name.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`.
pub fn file_safe_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/srv/uploads/user-7/lecture_notes.jpg")),
            "lecture_notes.jpg"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_hash_id_deterministic() {
        assert_eq!(hash_id("owner-1"), hash_id("owner-1"));
        assert_eq!(hash_id("owner-1").len(), 16);
    }

    #[test]
    fn test_hash_id_different_ids_differ() {
        assert_ne!(hash_id("owner-1"), hash_id("owner-2"));
    }

    #[test]
    fn test_file_safe_id_keeps_allowed_chars() {
        assert_eq!(
            file_safe_id("3f2b9c1e-aa_01"),
            "3f2b9c1e-aa_01"
        );
    }

    #[test]
    fn test_file_safe_id_replaces_separators() {
        assert_eq!(file_safe_id("../etc/passwd"), "___etc_passwd");
        assert_eq!(file_safe_id("a b.c"), "a_b_c");
    }

    #[test]
    fn test_file_safe_id_non_ascii() {
        assert_eq!(file_safe_id("notiz-ä"), "notiz-_");
    }
}
