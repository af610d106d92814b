//! Per-job run serialization.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Exclusive flag for one job id plus the waiters parked on it.
#[derive(Default)]
struct RunSlot {
    held: Mutex<bool>,
    released: Condvar,
}

type LockTable = Mutex<HashMap<String, Arc<RunSlot>>>;

fn recover<'a, T>(
    result: std::sync::LockResult<MutexGuard<'a, T>>,
    what: &str,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(|poisoned| {
        log::warn!("{} was poisoned, recovering", what);
        poisoned.into_inner()
    })
}

/// Hands out one exclusive run lock per job id.
///
/// Entries are dropped once no run holds or waits for them. Waiting parks
/// the calling OS thread.
#[derive(Default, Clone)]
pub struct JobLocks {
    table: Arc<LockTable>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no other run holds `job_id`.
    pub fn lock(&self, job_id: &str) -> JobLockGuard {
        let slot = {
            let mut table = recover(self.table.lock(), "Job lock table");
            Arc::clone(table.entry(job_id.to_string()).or_default())
        };

        {
            let mut held = recover(slot.held.lock(), "Job run lock");
            while *held {
                held = slot
                    .released
                    .wait(held)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            *held = true;
        }

        JobLockGuard {
            job_id: job_id.to_string(),
            table: Arc::clone(&self.table),
            slot,
        }
    }

    /// Whether a run holds or awaits `job_id`.
    pub fn is_held(&self, job_id: &str) -> bool {
        recover(self.table.lock(), "Job lock table").contains_key(job_id)
    }

    /// Number of ids currently locked or awaited.
    pub fn active(&self) -> usize {
        recover(self.table.lock(), "Job lock table").len()
    }
}

/// Releases the run lock on drop.
pub struct JobLockGuard {
    job_id: String,
    table: Arc<LockTable>,
    slot: Arc<RunSlot>,
}

impl Drop for JobLockGuard {
    fn drop(&mut self) {
        let mut table = recover(self.table.lock(), "Job lock table");
        // Held by the table and by this guard only: nobody is waiting.
        if Arc::strong_count(&self.slot) <= 2 {
            table.remove(&self.job_id);
        }

        *recover(self.slot.held.lock(), "Job run lock") = false;
        self.slot.released.notify_one();
    }
}
