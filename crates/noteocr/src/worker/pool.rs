use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, error, info, warn};

use crate::error::WorkerError;
use crate::pipeline::Pipeline;
use crate::worker::job::{JobOutcome, OcrJobRequest};

/// Fixed set of OS threads draining a bounded job queue.
pub struct WorkerPool {
    job_sender: Sender<OcrJobRequest>,
    job_receiver: Receiver<OcrJobRequest>,
    result_receiver: Receiver<JobOutcome>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    capacity: usize,
}

impl WorkerPool {
    /// Starts `worker_count` workers sharing one pipeline.
    ///
    /// At most `queue_capacity` jobs wait for a worker; further submissions
    /// are rejected.
    pub fn new(
        pipeline: Arc<Pipeline>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }
        let capacity = queue_capacity.max(1);
        let (job_sender, job_receiver) = bounded::<OcrJobRequest>(capacity);
        let (result_sender, result_receiver) = bounded::<JobOutcome>(capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_pipeline = Arc::clone(&pipeline);

            let handle = thread::Builder::new()
                .name(format!("noteocr-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, job_rx, result_tx, shutdown_flag, worker_pipeline);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender,
            job_receiver,
            result_receiver,
            workers,
            shutdown,
            capacity,
        })
    }

    /// Queues a job without blocking.
    pub fn submit(&self, job: OcrJobRequest) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => WorkerError::QueueFull {
                capacity: self.capacity,
            },
            TrySendError::Disconnected(_) => WorkerError::ChannelClosed,
        })
    }

    pub fn try_recv_result(&self) -> Option<JobOutcome> {
        match self.result_receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_result(&self) -> Option<JobOutcome> {
        self.result_receiver.recv().ok()
    }

    pub fn recv_result_timeout(&self, timeout: Duration) -> Option<JobOutcome> {
        self.result_receiver.recv_timeout(timeout).ok()
    }

    /// Number of jobs waiting for a worker.
    pub fn pending(&self) -> usize {
        self.job_sender.len()
    }

    /// Stops workers after their current job. Queued jobs are abandoned.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Closes the queue and joins all workers. Without a prior `shutdown`
    /// the queue is drained first.
    ///
    /// Returns the jobs no worker picked up.
    pub fn wait(self) -> Vec<OcrJobRequest> {
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        let abandoned: Vec<OcrJobRequest> = self.job_receiver.try_iter().collect();
        if !abandoned.is_empty() {
            warn!("{} queued jobs were not started", abandoned.len());
        }
        info!("All workers have stopped");
        abandoned
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<OcrJobRequest>,
    result_sender: Sender<JobOutcome>,
    shutdown: Arc<AtomicBool>,
    pipeline: Arc<Pipeline>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => {
                debug!("Worker {} processing job: {}", worker_id, job.file_id);

                let result = pipeline.run(&job);
                if let Err(ref e) = result {
                    warn!("Worker {} job {} failed: {}", worker_id, job.file_id, e);
                }

                match result_sender.try_send(JobOutcome::from_result(&job.file_id, &result)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(outcome)) => {
                        debug!(
                            "Worker {} dropped outcome for {}: result channel full",
                            worker_id, outcome.job_id
                        );
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        debug!("Worker {} result channel disconnected", worker_id);
                        break;
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
