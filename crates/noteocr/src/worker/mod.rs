pub mod job;
pub mod pool;

pub use job::{JobOutcome, OcrJobRequest};
pub use pool::WorkerPool;
