pub mod config;
pub mod context;
pub mod error;
pub mod locks;
pub mod runner;
pub mod title;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::PipelineError;
pub use locks::JobLocks;
pub use runner::Pipeline;
pub use title::derive_document_title;
