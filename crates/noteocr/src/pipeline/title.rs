use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static RE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_-]").unwrap());
static RE_WORD_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w").unwrap());

/// Builds a document title from an uploaded file name.
///
/// `"my_notes-v2.jpg"` becomes `"My Notes V2 (OCR)"`.
pub fn derive_document_title(original_file_name: &str) -> String {
    let stem = Path::new(original_file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let spaced = RE_SEPARATORS.replace_all(&stem, " ");
    let titled = RE_WORD_START.replace_all(&spaced, |caps: &Captures<'_>| caps[0].to_uppercase());

    format!("{} (OCR)", titled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_separators() {
        assert_eq!(derive_document_title("my_notes-v2.jpg"), "My Notes V2 (OCR)");
    }

    #[test]
    fn test_only_last_extension_is_stripped() {
        assert_eq!(derive_document_title("week.3.notes.png"), "Week.3.Notes (OCR)");
    }

    #[test]
    fn test_no_extension() {
        assert_eq!(derive_document_title("scan"), "Scan (OCR)");
    }

    #[test]
    fn test_existing_capitals_kept() {
        assert_eq!(derive_document_title("CS101_lecture.jpeg"), "CS101 Lecture (OCR)");
    }

    #[test]
    fn test_directory_components_ignored() {
        assert_eq!(derive_document_title("uploads/biology_ch4.png"), "Biology Ch4 (OCR)");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(derive_document_title(""), "Untitled (OCR)");
    }
}
