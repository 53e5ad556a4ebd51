//! Chunked batch processing with progress reporting
//!
//! Large workloads are split into fixed-size chunks; each chunk settles
//! fully through the concurrency limiter before the processor yields and
//! moves on, bounding peak queue depth and giving the host process
//! breathing room. This is the only component that advances the per-scan
//! counters.

use crate::limiter::TaskLimiter;
use crate::types::{ScanProgress, ScanStats};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default number of items per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Chunked processor driving items through the limiter
pub struct BatchProcessor {
    limiter: Arc<TaskLimiter>,
    chunk_size: usize,
}

impl BatchProcessor {
    /// Create a processor over the given limiter
    pub fn new(limiter: Arc<TaskLimiter>, chunk_size: usize) -> Self {
        Self {
            limiter,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Process every item, collecting the successful results
    ///
    /// `action` returns the item's result and whether it was served from
    /// cache. Item failures are isolated: they are counted in `stats` and
    /// the batch continues. Earlier items in a chunk get higher admission
    /// priority, tightening tail latency for progress reporting.
    pub async fn process_all<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        stats: Arc<Mutex<ScanStats>>,
        progress: Option<mpsc::Sender<ScanProgress>>,
        action: F,
    ) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<(R, bool)>> + Send + 'static,
    {
        let submitted = items.len();
        if submitted == 0 {
            return Vec::new();
        }
        // Progress is reported against the scan-wide total, not just this
        // call's slice
        let total = stats.lock().unwrap().total_candidates.max(submitted);

        let action = Arc::new(action);
        let mut results = Vec::with_capacity(total);
        let mut iter = items.into_iter();

        loop {
            let chunk: Vec<T> = iter.by_ref().take(self.chunk_size).collect();
            if chunk.is_empty() {
                break;
            }

            let batch_len = chunk.len() as i64;
            let mut set = JoinSet::new();
            for (index, item) in chunk.into_iter().enumerate() {
                let priority = batch_len - index as i64;
                let limiter = Arc::clone(&self.limiter);
                let action = Arc::clone(&action);
                set.spawn(async move { limiter.run(priority, action(item)).await });
            }

            // The whole chunk settles before the next one starts
            while let Some(joined) = set.join_next().await {
                let mut stats = stats.lock().unwrap();
                stats.processed += 1;
                match joined {
                    Ok(Ok((result, from_cache))) => {
                        if from_cache {
                            stats.cache_hits += 1;
                        }
                        drop(stats);
                        results.push(result);
                    }
                    Ok(Err(err)) => {
                        stats.errors += 1;
                        drop(stats);
                        debug!("batch item failed: {}", err);
                    }
                    Err(join_err) => {
                        stats.errors += 1;
                        drop(stats);
                        warn!("batch task aborted: {}", join_err);
                    }
                }
            }

            if let Some(tx) = &progress {
                let processed = stats.lock().unwrap().processed;
                let event = ScanProgress {
                    processed,
                    total,
                    percentage: (processed as f64 / total as f64) * 100.0,
                };
                let _ = tx.send(event).await;
            }

            tokio::task::yield_now().await;
        }

        results
    }
}
