//! Job status tracking and real-time progress broadcasting.

pub mod job_progress;
pub mod job_store;

pub use job_progress::{JobProgressBroadcaster, JobStatus, OcrJobStatus};
pub use job_store::{IdleRecord, JobStore};
