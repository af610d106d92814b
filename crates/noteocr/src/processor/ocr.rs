use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use crate::config::schema::{OcrBackend, OcrConfig};
use crate::error::ProcessError;

/// Factory for single-use recognition sessions.
pub trait OcrEngine: Send + Sync {
    /// Opens a session. The session is released when dropped.
    fn open(&self) -> Result<Box<dyn OcrSession>, ProcessError>;
}

/// One recognition call against an opened engine.
pub trait OcrSession {
    fn recognize(&mut self, image: &Path) -> Result<String, ProcessError>;
}

fn join_languages(languages: &[String]) -> String {
    if languages.is_empty() {
        "eng".to_string()
    } else {
        languages.join("+")
    }
}

/// Builds the engine selected by configuration.
pub fn build_engine(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>, ProcessError> {
    match config.backend {
        OcrBackend::Cli => Ok(Arc::new(TesseractCli::new(
            &config.command,
            &config.languages,
        ))),
        #[cfg(feature = "tesseract")]
        OcrBackend::Leptess => Ok(Arc::new(LeptessEngine::new(&config.languages))),
        #[cfg(not(feature = "tesseract"))]
        OcrBackend::Leptess => Err(ProcessError::OcrInit(
            "leptess backend requested but the 'tesseract' feature is not enabled".to_string(),
        )),
    }
}

/// Runs the `tesseract` command-line tool once per session.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
    languages: String,
}

impl TesseractCli {
    pub fn new(command: &str, languages: &[String]) -> Self {
        Self {
            command: command.to_string(),
            languages: join_languages(languages),
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }
}

impl OcrEngine for TesseractCli {
    fn open(&self) -> Result<Box<dyn OcrSession>, ProcessError> {
        Ok(Box::new(self.clone()))
    }
}

impl OcrSession for TesseractCli {
    fn recognize(&mut self, image: &Path) -> Result<String, ProcessError> {
        let _span = tracing::info_span!("processor.ocr", backend = "cli").entered();

        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .output()
            .map_err(|e| {
                ProcessError::OcrInit(format!("Failed to run {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessError::OcrFailed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// In-process Tesseract via leptess. Each session owns its own instance.
#[cfg(feature = "tesseract")]
#[derive(Debug, Clone)]
pub struct LeptessEngine {
    languages: String,
}

#[cfg(feature = "tesseract")]
impl LeptessEngine {
    pub fn new(languages: &[String]) -> Self {
        Self {
            languages: join_languages(languages),
        }
    }
}

#[cfg(feature = "tesseract")]
struct LeptessSession {
    lt: leptess::LepTess,
}

#[cfg(feature = "tesseract")]
impl OcrEngine for LeptessEngine {
    fn open(&self) -> Result<Box<dyn OcrSession>, ProcessError> {
        let lt = leptess::LepTess::new(None, &self.languages).map_err(|e| {
            ProcessError::OcrInit(format!("Failed to initialize Tesseract: {}", e))
        })?;
        Ok(Box::new(LeptessSession { lt }))
    }
}

#[cfg(feature = "tesseract")]
impl OcrSession for LeptessSession {
    fn recognize(&mut self, image: &Path) -> Result<String, ProcessError> {
        let _span = tracing::info_span!("processor.ocr", backend = "leptess").entered();

        self.lt
            .set_image(image)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;

        self.lt
            .get_utf8_text()
            .map_err(|e| ProcessError::OcrFailed(format!("OCR failed: {}", e)))
    }
}
