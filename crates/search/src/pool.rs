//! Bounded dispatch of collaborator calls
//!
//! Every embedder, store and reranker call runs on its own spawned task. A
//! semaphore caps how many of those tasks may be in flight across all
//! requests; callers beyond the cap wait for a permit. CPU-bound collaborators
//! compute under `spawn_blocking`, so a pooled task only ever waits.

use paperlens_common::errors::{AppError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default cap on concurrent collaborator calls
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Shared pool handle. Cloning shares the same permits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool allowing `size` concurrent calls (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a running call
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `fut` on a pooled task and wait for its result.
    ///
    /// The permit is held by the spawned task, so it is released when the
    /// call finishes even if the caller has stopped waiting. A panicking call
    /// surfaces as `AppError::Internal`.
    pub async fn submit<F, T>(&self, task: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal {
                message: format!("worker pool closed while dispatching {}: {}", task, e),
            })?;

        tracing::trace!(task, available = self.permits.available_permits(), "Dispatching call");

        let handle = tokio::spawn(async move {
            let _permit = permit;
            fut.await
        });

        handle.await?
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_returns_value() {
        let pool = WorkerPool::new(2);
        let value = pool.submit("answer", async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_submit_propagates_error() {
        let pool = WorkerPool::default();
        let result: Result<()> = pool
            .submit("failing", async {
                Err(AppError::RerankError {
                    message: "boom".to_string(),
                })
            })
            .await;
        assert!(matches!(result, Err(AppError::RerankError { .. })));
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let pool = WorkerPool::new(1);
        let result: Result<()> = pool
            .submit("panicking", async { panic!("collaborator exploded") })
            .await;
        assert!(matches!(result, Err(AppError::Internal { .. })));
        // permit came back
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_calls_are_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let calls = (0..8).map(|_| {
            let pool = pool.clone();
            let running = running.clone();
            let peak = peak.clone();
            async move {
                pool.submit("sleepy", async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }
        });

        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_in_process_embed_leaves_runtime_responsive() {
        use paperlens_common::{embeddings::HashEmbedder, Embedder};
        use std::sync::atomic::AtomicBool;
        use std::sync::Mutex;
        use std::time::Instant;

        let pool = WorkerPool::new(2);
        let done = Arc::new(AtomicBool::new(false));
        let last_tick = Arc::new(Mutex::new(Instant::now()));
        let max_gap = Arc::new(Mutex::new(Duration::ZERO));

        let ticker = tokio::spawn({
            let done = done.clone();
            let last_tick = last_tick.clone();
            let max_gap = max_gap.clone();
            async move {
                while !done.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    let now = Instant::now();
                    let mut last = last_tick.lock().unwrap();
                    let gap = now - *last;
                    *last = now;
                    let mut max = max_gap.lock().unwrap();
                    *max = (*max).max(gap);
                }
            }
        });

        let text = (0..200)
            .map(|i| format!("term{:03}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let embedder = HashEmbedder::new(200_000);
        let vector = pool
            .submit("embed", async move { embedder.embed(&text).await })
            .await
            .unwrap();
        assert_eq!(vector.len(), 200_000);

        let tail = last_tick.lock().unwrap().elapsed();
        done.store(true, Ordering::SeqCst);
        ticker.await.unwrap();

        let stalled = (*max_gap.lock().unwrap()).max(tail);
        assert!(
            stalled < Duration::from_millis(100),
            "runtime stalled for {:?} during embed",
            stalled
        );
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
        tokio_test::assert_ok!(tokio_test::block_on(pool.submit("one", async { Ok(()) })));
    }
}
