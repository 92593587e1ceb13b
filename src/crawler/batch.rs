//! Chunked batching with cooldowns
//!
//! Items are split into consecutive chunks of `concurrency`. Workers inside a
//! chunk run together; the next chunk starts only once the whole chunk has
//! settled and the cooldown has elapsed. No cooldown follows the last chunk.

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use crate::error::{Error, Result};

/// Batch configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Workers per chunk
    pub concurrency: usize,
    /// Pause between chunks in milliseconds
    pub cooldown_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            cooldown_ms: 10_000,
        }
    }
}

/// What a batch run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<R> {
    /// Successful worker results, chunk by chunk
    pub results: Vec<R>,
    /// Chunks executed
    pub chunks: usize,
    /// Workers that returned an error or panicked
    pub failed: usize,
}

impl<R> BatchOutcome<R> {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }
}

/// Runs workers over items in cooled-down chunks
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    concurrency: usize,
    cooldown: Duration,
}

impl BatchScheduler {
    /// # Errors
    ///
    /// Returns a validation error when `concurrency` is zero
    pub fn new(concurrency: usize, cooldown: Duration) -> Result<Self> {
        if concurrency == 0 {
            return Err(Error::validation("batch concurrency must be greater than 0"));
        }
        Ok(Self {
            concurrency,
            cooldown,
        })
    }

    pub fn from_config(config: &BatchConfig) -> Result<Self> {
        Self::new(config.concurrency, Duration::from_millis(config.cooldown_ms))
    }

    /// Run `worker` over every item
    ///
    /// A worker error or panic is logged and counted; it never stops the
    /// chunk or the chunks after it.
    pub async fn run<T, R, E, W, Fut>(&self, items: Vec<T>, worker: W) -> BatchOutcome<R>
    where
        W: Fn(T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        E: Display,
    {
        let total = items.len();
        let mut outcome = BatchOutcome {
            results: Vec::with_capacity(total),
            chunks: 0,
            failed: 0,
        };

        let mut remaining = items.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<T> = remaining.by_ref().take(self.concurrency).collect();
            outcome.chunks += 1;

            tracing::debug!(chunk = outcome.chunks, size = chunk.len(), "Running batch chunk");

            let settled = join_all(
                chunk
                    .into_iter()
                    .map(|item| AssertUnwindSafe(worker(item)).catch_unwind()),
            )
            .await;

            for result in settled {
                match result {
                    Ok(Ok(value)) => outcome.results.push(value),
                    Ok(Err(e)) => {
                        outcome.failed += 1;
                        tracing::warn!(chunk = outcome.chunks, error = %e, "Batch item failed");
                    }
                    Err(_) => {
                        outcome.failed += 1;
                        tracing::error!(chunk = outcome.chunks, "Batch item panicked");
                    }
                }
            }

            if remaining.peek().is_some() && !self.cooldown.is_zero() {
                tracing::debug!(cooldown_ms = self.cooldown.as_millis() as u64, "Cooling down");
                tokio::time::sleep(self.cooldown).await;
            }
        }

        tracing::info!(
            items = total,
            chunks = outcome.chunks,
            succeeded = outcome.succeeded(),
            failed = outcome.failed,
            "Batch finished"
        );

        outcome
    }
}

/// One-shot form of [`BatchScheduler::run`]
pub async fn process_in_batches<T, R, E, W, Fut>(
    items: Vec<T>,
    worker: W,
    concurrency: usize,
    cooldown: Duration,
) -> Result<BatchOutcome<R>>
where
    W: Fn(T) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
    E: Display,
{
    let scheduler = BatchScheduler::new(concurrency, cooldown)?;
    Ok(scheduler.run(items, worker).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = BatchScheduler::new(0, Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_default_config() {
        let config = BatchConfig::default();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.cooldown_ms, 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uneven_last_chunk() {
        let scheduler = BatchScheduler::new(4, Duration::from_secs(1)).unwrap();
        let outcome = scheduler
            .run((1..=10).collect(), |n: u32| async move { Ok::<_, String>(n * 2) })
            .await;

        assert_eq!(outcome.chunks, 3);
        assert_eq!(outcome.results.len(), 10);
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_batch() {
        let seen = Arc::new(AtomicUsize::new(0));
        let scheduler = BatchScheduler::new(2, Duration::from_millis(10)).unwrap();

        let outcome = scheduler
            .run((0..6).collect(), |n: usize| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    if n % 3 == 0 {
                        Err(format!("stop {n} unavailable"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 6);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.results, vec![1, 2, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_worker_is_counted_as_failed() {
        let scheduler = BatchScheduler::new(3, Duration::from_millis(10)).unwrap();

        let outcome = scheduler
            .run((0..6).collect(), |n: u32| async move {
                if n == 1 {
                    panic!("malformed stop payload");
                }
                Ok::<_, String>(n)
            })
            .await;

        assert_eq!(outcome.chunks, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.results, vec![0, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_cooldown_after_last_chunk() {
        let started = tokio::time::Instant::now();
        let outcome = process_in_batches(
            vec![1, 2, 3],
            |n: i32| async move { Ok::<_, String>(n) },
            4,
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(outcome.chunks, 1);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_empty_items() {
        let outcome = process_in_batches(
            Vec::<u8>::new(),
            |n: u8| async move { Ok::<_, String>(n) },
            4,
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert_eq!(outcome.chunks, 0);
        assert!(outcome.results.is_empty());
    }
}
