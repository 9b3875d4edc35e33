//! Bounded worker pool for blocking backend calls
//!
//! Legacy generation clients block the calling thread. They run here, on
//! tokio's blocking threads, with at most `max_workers` in flight so a burst
//! of requests cannot starve the runtime. The pool has an explicit
//! lifecycle: after [`WorkerPool::dispose`] no new work is accepted.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::backends::{GenerationBackend, LegacyGenerationBackend};
use crate::errors::{AssistError, Result};

/// Default time `dispose` waits for in-flight tasks
pub const DEFAULT_DISPOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded executor for blocking work
#[derive(Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    dispose_timeout: Duration,
    disposed: AtomicBool,
}

impl WorkerPool {
    /// Create a pool with `max_workers` concurrent slots (at least one)
    pub fn new(max_workers: usize) -> Self {
        Self::with_dispose_timeout(max_workers, DEFAULT_DISPOSE_TIMEOUT)
    }

    /// Pool sized to the number of CPUs
    pub fn with_cpu_count() -> Self {
        Self::new(num_cpus::get())
    }

    pub fn with_dispose_timeout(max_workers: usize, dispose_timeout: Duration) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            dispose_timeout,
            disposed: AtomicBool::new(false),
        }
    }

    /// Run a blocking task on the pool.
    ///
    /// Waits for a free slot; fails with [`AssistError::PoolDisposed`] once the
    /// pool has been disposed.
    pub async fn run<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_disposed() {
            return Err(AssistError::PoolDisposed);
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AssistError::PoolDisposed)?;

        // dispose() may have started while this call waited for a slot
        if self.is_disposed() {
            return Err(AssistError::PoolDisposed);
        }

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        });

        handle
            .await
            .map_err(|e| AssistError::Generic(format!("Worker task failed: {}", e)))?
    }

    /// Slots currently free
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Stop accepting work and wait (bounded) for in-flight tasks.
    ///
    /// Never fails: problems during teardown are logged. Calling it twice is
    /// a no-op.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            debug!("worker pool already disposed");
            return;
        }

        let slots = u32::try_from(self.max_workers).unwrap_or(u32::MAX);
        match tokio::time::timeout(self.dispose_timeout, self.semaphore.acquire_many(slots)).await {
            Ok(Ok(_drained)) => info!(max_workers = self.max_workers, "worker pool disposed"),
            Ok(Err(e)) => warn!(error = %e, "worker pool closed before dispose"),
            Err(_) => warn!(
                timeout_ms = self.dispose_timeout.as_millis() as u64,
                "worker pool disposed with tasks still running"
            ),
        }

        self.semaphore.close();
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_cpu_count()
    }
}

/// Adapts a blocking backend to the async generation contract by running
/// every call on a worker pool
pub struct PooledBackend<L: LegacyGenerationBackend> {
    inner: Arc<L>,
    pool: Arc<WorkerPool>,
}

impl<L: LegacyGenerationBackend> PooledBackend<L> {
    pub fn new(inner: L, pool: Arc<WorkerPool>) -> Self {
        Self {
            inner: Arc::new(inner),
            pool,
        }
    }
}

#[async_trait]
impl<L: LegacyGenerationBackend> GenerationBackend for PooledBackend<L> {
    async fn complete(&self, question: &str, context: &str) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let question = question.to_string();
        let context = context.to_string();
        self.pool.run(move || inner.complete(&question, &context)).await
    }
}
