//! Tracking of asynchronous work spawned while deserializing.
//!
//! The library doesn't schedule anything itself. Component payloads may
//! offload expensive work through a [`JobContext`], and whoever owns the
//! context waits for it before relying on the results.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs jobs, possibly on other threads.
pub trait Executor: Send + Sync {
    /// Enqueues a job. It may run before this returns.
    fn spawn(&self, job: Job);
}

/// Runs jobs immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

/// Runs jobs on rayon's global thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonExecutor;

/// Enqueues jobs on an [`Executor`] and keeps count of the unfinished ones.
///
/// Clones share the same counter.
#[derive(Clone)]
pub struct JobContext {
    executor: Arc<dyn Executor>,
    pending: Arc<Pending>,
}

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

/// Decrements the pending count even if the job panics.
struct Finish(Arc<Pending>);

impl Executor for InlineExecutor {
    fn spawn(&self, job: Job) {
        job();
    }
}

impl Executor for RayonExecutor {
    fn spawn(&self, job: Job) {
        rayon::spawn(job);
    }
}

impl JobContext {
    /// Creates a context that enqueues on `executor`.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor, pending: Arc::default() }
    }

    /// Creates a context that runs everything on the calling thread.
    pub fn inline() -> Self {
        Self::new(Arc::new(InlineExecutor))
    }

    /// Enqueues a job.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        *self.pending.count.lock() += 1;

        let finish = Finish(Arc::clone(&self.pending));

        self.executor.spawn(Box::new(move || {
            let _finish = finish;

            job();
        }));
    }

    /// The amount of jobs that haven't finished yet.
    pub fn pending(&self) -> usize {
        *self.pending.count.lock()
    }

    /// Returns `true` if any job hasn't finished yet.
    pub fn is_busy(&self) -> bool {
        self.pending() > 0
    }

    /// Blocks until every enqueued job has finished.
    pub fn wait(&self) {
        let mut count = self.pending.count.lock();

        while *count > 0 {
            self.pending.idle.wait(&mut count);
        }
    }
}

impl Default for JobContext {
    fn default() -> Self {
        Self::new(Arc::new(RayonExecutor))
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl Drop for Finish {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();

        *count -= 1;

        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}
