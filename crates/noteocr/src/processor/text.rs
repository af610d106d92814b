use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::ocr::OcrEngine;
use crate::error::ProcessError;
use crate::sanitize;

static RE_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_INLINE_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]{2,}").unwrap());

/// Normalizes raw OCR output into prose.
///
/// Trims the ends, collapses 3+ newlines into a blank line and runs of
/// other whitespace into one space. Applying it twice changes nothing.
pub fn clean_extracted_text(raw: &str) -> String {
    let text = raw.trim();
    let text = RE_BLANK_LINES.replace_all(text, "\n\n");
    RE_INLINE_WS.replace_all(&text, " ").into_owned()
}

/// Runs one OCR session per image and cleans the result.
#[derive(Clone)]
pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }

    pub fn extract(&self, image: &Path) -> Result<String, ProcessError> {
        let _span = tracing::info_span!(
            "processor.extract",
            file = %sanitize::redact_path(image)
        )
        .entered();

        let mut session = self.engine.open()?;
        let raw = session.recognize(image);
        drop(session);

        let text = clean_extracted_text(&raw?);
        log::debug!(
            "Extracted {} characters from {}",
            text.chars().count(),
            sanitize::redact_path(image)
        );
        Ok(text)
    }
}
