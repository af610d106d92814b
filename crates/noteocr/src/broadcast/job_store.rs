//! Job status tracker backed by a bounded in-memory cache.
//!
//! The cache is authoritative while a job runs. Once an entry is evicted
//! (capacity or TTL) reads fall back to the durable file status.

use std::sync::Arc;
use std::time::Duration;

use moka::ops::compute::Op;
use moka::sync::Cache;

use crate::broadcast::job_progress::{JobProgressBroadcaster, JobStatus, OcrJobStatus};
use crate::error::StorageError;
use crate::storage::FileStore;

/// Result of [`JobStore::record_if_idle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleRecord {
    /// Written; holds the terminal state it replaced, if any.
    Recorded(Option<OcrJobStatus>),
    /// The job already has a non-terminal state; nothing was written.
    Busy,
}

/// Tracks the latest status of every known job.
pub struct JobStore {
    cache: Cache<String, OcrJobStatus>,
    broadcaster: Option<JobProgressBroadcaster>,
    files: Arc<dyn FileStore>,
}

impl JobStore {
    /// Creates a tracker holding at most `capacity` jobs, each for at most `ttl`.
    pub fn new(capacity: u64, ttl: Duration, files: Arc<dyn FileStore>) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            broadcaster: None,
            files,
        }
    }

    /// Publishes every recorded status on the given broadcaster.
    pub fn with_broadcaster(mut self, broadcaster: JobProgressBroadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn broadcaster(&self) -> Option<&JobProgressBroadcaster> {
        self.broadcaster.as_ref()
    }

    /// Overwrites the tracked state for `status.id`.
    pub fn record(&self, status: &OcrJobStatus) {
        self.cache
            .entry(status.id.clone())
            .and_upsert_with(|_| status.clone());
        self.publish(status);
    }

    /// Records `status` only when the job has no tracked state or a terminal
    /// one. Returns what was replaced, or `Busy` when nothing was written.
    pub fn record_if_idle(&self, status: &OcrJobStatus) -> IdleRecord {
        let mut outcome = IdleRecord::Busy;
        self.cache
            .entry(status.id.clone())
            .and_compute_with(|current| match current {
                Some(entry) if !entry.value().status.is_terminal() => Op::Nop,
                current => {
                    outcome = IdleRecord::Recorded(current.map(|e| e.into_value()));
                    Op::Put(status.clone())
                }
            });

        if matches!(outcome, IdleRecord::Recorded(_)) {
            self.publish(status);
        }
        outcome
    }

    /// Puts `previous` back (or forgets the job) if the tracked state is
    /// still exactly `expected`. Returns whether anything changed.
    pub fn restore_if_current(
        &self,
        expected: &OcrJobStatus,
        previous: Option<OcrJobStatus>,
    ) -> bool {
        let mut restored = false;
        let replacement = previous.clone();
        self.cache
            .entry(expected.id.clone())
            .and_compute_with(|current| match current {
                Some(entry) if entry.value() == expected => {
                    restored = true;
                    match replacement {
                        Some(prior) => Op::Put(prior),
                        None => Op::Remove,
                    }
                }
                _ => Op::Nop,
            });

        if restored {
            if let Some(ref prior) = previous {
                self.publish(prior);
            }
        }
        restored
    }

    /// Forgets a job whose tracked state is not terminal, so reads fall
    /// back to the durable status. Returns whether an entry was removed.
    pub fn remove_if_unfinished(&self, job_id: &str) -> bool {
        let mut removed = false;
        self.cache
            .entry(job_id.to_string())
            .and_compute_with(|current| match current {
                Some(entry) if !entry.value().status.is_terminal() => {
                    removed = true;
                    Op::Remove
                }
                _ => Op::Nop,
            });
        removed
    }

    fn publish(&self, status: &OcrJobStatus) {
        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.send(status.clone());
        }
    }

    /// Returns the tracked state, if any.
    pub fn get(&self, job_id: &str) -> Option<OcrJobStatus> {
        self.cache.get(job_id)
    }

    /// Drops the tracked state for a job.
    pub fn remove(&self, job_id: &str) {
        self.cache.invalidate(job_id);
    }

    /// Returns the tracked state, or a view synthesized from the durable
    /// file record. `None` when neither source knows the id.
    pub fn read_status(&self, job_id: &str) -> Result<Option<OcrJobStatus>, StorageError> {
        if let Some(status) = self.get(job_id) {
            return Ok(Some(status));
        }

        let Some(file) = self.files.find_file_by_id(job_id)? else {
            return Ok(None);
        };

        log::debug!(
            "No tracked state for {}, using durable status {}",
            job_id,
            file.status
        );

        let progress = if file.status == JobStatus::Processed {
            100
        } else {
            0
        };

        Ok(Some(OcrJobStatus {
            id: file.id,
            status: file.status,
            progress: Some(progress),
            message: Some(format!("File status: {}", file.status)),
            document_id: None,
            created_at: file.created_at,
        }))
    }

    /// Number of tracked jobs. Approximate until pending cache tasks run.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
