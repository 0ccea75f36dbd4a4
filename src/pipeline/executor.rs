//! Execution contexts for decode jobs.
//!
//! The frame callback must never block, so decode work is handed to a
//! [`DecodeExecutor`]. The pipeline's gate keeps at most one job in
//! flight; executors do not queue on its behalf.

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A unit of decode work.
pub type DecodeJob = Box<dyn FnOnce() + Send + 'static>;

/// Errors returned when a job cannot be accepted.
///
/// The rejected job is dropped, which releases any gate permit it owns.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("executor is shut down")]
    ShutDown,
    #[error("executor is saturated")]
    Saturated,
}

/// Accepts decode jobs without blocking the submitter.
pub trait DecodeExecutor: Send + Sync {
    fn submit(&self, job: DecodeJob) -> Result<(), SubmitError>;
}

/// Runs jobs on the submitting thread. Deterministic; meant for tests.
#[derive(Debug, Default)]
pub struct InlineExecutor;

impl DecodeExecutor for InlineExecutor {
    fn submit(&self, job: DecodeJob) -> Result<(), SubmitError> {
        run_contained(job);
        Ok(())
    }
}

/// Fixed set of named worker threads fed by a bounded channel.
pub struct WorkerPool {
    sender: Mutex<Option<Sender<DecodeJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one).
    pub fn new(size: usize) -> std::io::Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = bounded::<DecodeJob>(size);

        let workers = (0..size)
            .map(|index| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("decode-worker-{index}"))
                    .spawn(move || {
                        debug!(worker = index, "Decode worker started");
                        for job in receiver.iter() {
                            run_contained(job);
                        }
                        debug!(worker = index, "Decode worker exiting");
                    })
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        info!(workers = size, "Decode worker pool started");
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Stops accepting jobs, lets queued jobs finish and joins the workers.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.join().is_err() {
                warn!("Decode worker panicked outside a job");
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl DecodeExecutor for WorkerPool {
    fn submit(&self, job: DecodeJob) -> Result<(), SubmitError> {
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(SubmitError::ShutDown)?;
        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::Saturated,
            TrySendError::Disconnected(_) => SubmitError::ShutDown,
        })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs a job, containing any panic to the job itself.
fn run_contained(job: DecodeJob) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!("Decode job panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inline_runs_immediately() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        InlineExecutor
            .submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    fn submit_retrying(pool: &WorkerPool, make: impl Fn() -> DecodeJob) {
        // A saturated submit drops the job unrun, so a fresh one is built per attempt
        loop {
            match pool.submit(make()) {
                Ok(()) => return,
                Err(SubmitError::Saturated) => thread::yield_now(),
                Err(e) => panic!("unexpected {e}"),
            }
        }
    }

    #[test]
    fn test_pool_runs_jobs_and_survives_panics() {
        let pool = WorkerPool::new(2).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        submit_retrying(&pool, || Box::new(|| panic!("bad frame")));
        for _ in 0..3 {
            submit_retrying(&pool, || {
                let counter = Arc::clone(&ran);
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });
        }

        pool.shutdown();
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert!(pool.is_shut_down());
    }

    #[test]
    fn test_submit_after_shutdown_drops_job() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown();

        let token = Arc::new(());
        let held = Arc::clone(&token);
        let result = pool.submit(Box::new(move || drop(held)));

        assert_eq!(result, Err(SubmitError::ShutDown));
        // The rejected job (and everything it owned) was dropped
        assert_eq!(Arc::strong_count(&token), 1);
    }
}
