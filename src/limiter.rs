//! Fixed concurrency ceiling for lookups.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Caps how many wrapped futures run at the same time
///
/// Cloning shares the same ceiling. Waiters are served in FIFO order by the
/// underlying semaphore.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    permits: Arc<Semaphore>,
    max: usize,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `max` concurrent runs (at least one)
    #[must_use]
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// The configured ceiling
    pub fn max(&self) -> usize {
        self.max
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `fut` once a slot is free
    ///
    /// The slot is released when `fut` finishes or is dropped, on every exit path.
    pub async fn run<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        // The semaphore is private and never closed, so acquire cannot fail
        let _permit = self.permits.acquire().await.ok();
        fut.await
    }
}
