//! Bounded worker admission with priority ordering
//!
//! Extraction tasks are admitted up to a CPU-derived concurrency bound.
//! Tasks arriving at capacity wait in a binary heap ordered by descending
//! priority (FIFO for equal priorities). When a running task finishes, the
//! head waiter is handed the slot and yields once before resuming, so deep
//! queues never grow the call stack.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Lower bound on worker admission
const MIN_WORKERS: usize = 4;

/// Upper bound on worker admission
const MAX_WORKERS: usize = 16;

struct Waiter {
    priority: i64,
    seq: u64,
    tx: oneshot::Sender<()>,
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Waiter {}

impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiter {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: highest priority first; earlier arrivals first among
        // equals (smaller sequence number compares greater).
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct LimiterState {
    active: usize,
    seq: u64,
    pending: BinaryHeap<Waiter>,
}

/// Priority-aware concurrency limiter
pub struct TaskLimiter {
    max_workers: usize,
    state: Mutex<LimiterState>,
}

impl TaskLimiter {
    /// Create a limiter admitting up to `max_workers` tasks at once
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            state: Mutex::new(LimiterState {
                active: 0,
                seq: 0,
                pending: BinaryHeap::new(),
            }),
        }
    }

    /// Create a limiter sized from the CPU count, clamped to [4, 16]
    pub fn from_cpu_count() -> Self {
        Self::new(num_cpus::get().clamp(MIN_WORKERS, MAX_WORKERS))
    }

    /// The admission bound
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Tasks currently admitted
    pub fn active(&self) -> usize {
        self.state.lock().unwrap().active
    }

    /// Tasks waiting for admission
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Run `fut` once a worker slot is available
    ///
    /// A failing future releases its slot like any other; the failure
    /// propagates to this caller only and never cancels sibling tasks.
    pub async fn run<F, T>(&self, priority: i64, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire(priority).await;
        fut.await
    }

    async fn acquire(&self, priority: i64) -> Permit<'_> {
        let waiting = {
            let mut state = self.state.lock().unwrap();
            if state.active < self.max_workers {
                state.active += 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.seq += 1;
                let seq = state.seq;
                state.pending.push(Waiter { priority, seq, tx });
                Some(rx)
            }
        };

        if let Some(rx) = waiting {
            // The releasing task keeps the slot assigned to us; yield once
            // before resuming instead of continuing on its stack.
            let _ = rx.await;
            tokio::task::yield_now().await;
        }

        Permit { limiter: self }
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap();
        loop {
            match state.pending.pop() {
                Some(waiter) => {
                    // Hand the slot over without decrementing; skip waiters
                    // whose receiver was dropped (cancelled acquires).
                    if waiter.tx.send(()).is_ok() {
                        return;
                    }
                }
                None => {
                    state.active -= 1;
                    return;
                }
            }
        }
    }
}

struct Permit<'a> {
    limiter: &'a TaskLimiter,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn cpu_sizing_is_clamped() {
        let limiter = TaskLimiter::from_cpu_count();
        assert!(limiter.max_workers() >= MIN_WORKERS);
        assert!(limiter.max_workers() <= MAX_WORKERS);
    }

    #[tokio::test]
    async fn immediate_admission_below_capacity() {
        let limiter = TaskLimiter::new(2);
        let result = limiter.run(0, async { 41 + 1 }).await;
        assert_eq!(result, 42);
        assert_eq!(limiter.active(), 0);
        assert_eq!(limiter.pending(), 0);
    }

    #[tokio::test]
    async fn pending_tasks_run_by_priority_then_arrival() {
        let limiter = Arc::new(TaskLimiter::new(1));
        let order = Arc::new(Mutex::new(Vec::new()));

        // Occupy the single slot until every waiter is queued
        let (hold_tx, hold_rx) = oneshot::channel::<()>();
        let l = Arc::clone(&limiter);
        let holder = tokio::spawn(async move {
            l.run(0, async move {
                let _ = hold_rx.await;
            })
            .await;
        });
        tokio::task::yield_now().await;
        assert_eq!(limiter.active(), 1);

        let mut handles = Vec::new();
        for (priority, tag) in [(1, "low"), (5, "high-a"), (5, "high-b"), (3, "mid")] {
            let l = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                l.run(priority, async move {
                    order.lock().unwrap().push(tag);
                })
                .await;
            }));
            // Make enqueue order deterministic
            tokio::task::yield_now().await;
        }
        assert_eq!(limiter.pending(), 4);

        hold_tx.send(()).unwrap();
        holder.await.unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        // Descending priority, FIFO among equals
        assert_eq!(
            *order.lock().unwrap(),
            vec!["high-a", "high-b", "mid", "low"]
        );
    }

    #[tokio::test]
    async fn failing_task_releases_its_slot() {
        let limiter = Arc::new(TaskLimiter::new(1));

        let result: Result<(), &str> = limiter.run(0, async { Err("extraction failed") }).await;
        assert!(result.is_err());

        // The slot must be free for the next task
        let ok = limiter.run(0, async { "fine" }).await;
        assert_eq!(ok, "fine");
        assert_eq!(limiter.active(), 0);
    }
}
