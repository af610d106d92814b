//! Image preprocessing and text extraction stages.

pub mod ocr;
pub mod preprocess;
pub mod text;

pub use ocr::{build_engine, OcrEngine, OcrSession, TesseractCli};
#[cfg(feature = "tesseract")]
pub use ocr::LeptessEngine;
pub use preprocess::{ImagePreprocessor, ImageTransform};
pub use text::{clean_extracted_text, TextExtractor};
