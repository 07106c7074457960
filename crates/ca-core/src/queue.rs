//! Request admission queue
//!
//! Serializes model calls so at most one is in flight per queue:
//! - FIFO admission (first poll of `enqueue` fixes the position)
//! - One drain worker runs tasks to completion, one at a time
//! - A failing or panicking task only affects its own caller
//! - Optional depth limit for back-pressure

use crate::config::QueueConfig;
use crate::error::QueueError;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Unit of work held by the queue
///
/// Runs the caller's closure and hands the output back over a one-shot
/// channel. Constructing it starts nothing; the drain worker polls it.
type QueuedTask = BoxFuture<'static, ()>;

/// Queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks accepted
    pub enqueued: u64,
    /// Tasks that ran to completion (whatever their own result)
    pub completed: u64,
    /// Tasks that panicked or were cancelled
    pub aborted: u64,
    /// Enqueue attempts refused by the depth limit
    pub rejected: u64,
    /// Tasks currently waiting or running
    pub depth: usize,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    completed: AtomicU64,
    aborted: AtomicU64,
    rejected: AtomicU64,
    depth: AtomicUsize,
}

/// One unit of queue depth; released on drop, including during a panic
struct Slot(Arc<Counters>);

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// FIFO admission queue with a single in-flight task
///
/// Share one instance (behind an `Arc`) between every component that talks to
/// the same binding. The drain worker is spawned on the Tokio runtime that
/// performs the first `enqueue`, and exits when the queue is dropped.
#[derive(Debug)]
pub struct AdmissionQueue {
    config: QueueConfig,
    sender: mpsc::UnboundedSender<QueuedTask>,
    pending_worker: Mutex<Option<mpsc::UnboundedReceiver<QueuedTask>>>,
    counters: Arc<Counters>,
}

impl AdmissionQueue {
    /// Create a new queue
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            sender,
            pending_worker: Mutex::new(Some(receiver)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create a shared unbounded queue
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new(QueueConfig::unbounded()))
    }

    /// Queue `work` behind everything already admitted and wait for its output
    ///
    /// # Errors
    /// - `QueueError::Full` if the depth limit is reached
    /// - `QueueError::TaskAborted` if the task panicked
    /// - `QueueError::Closed` if the drain worker is gone
    pub async fn enqueue<T, F, Fut>(&self, work: F) -> Result<T, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let slot = self.admit()?;
        self.ensure_worker();

        let (tx, rx) = oneshot::channel();
        let task: QueuedTask = Box::pin(async move {
            let output = work().await;
            // Free the slot before waking the caller so it can enqueue again.
            drop(slot);
            // Caller may have stopped waiting; the work still counts as done.
            let _ = tx.send(output);
        });

        if self.sender.send(task).is_err() {
            return Err(QueueError::Closed);
        }
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);

        rx.await.map_err(|_| QueueError::TaskAborted)
    }

    /// Get queue statistics
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            aborted: self.counters.aborted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            depth: self.counters.depth.load(Ordering::SeqCst),
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn admit(&self) -> Result<Slot, QueueError> {
        let Some(capacity) = self.config.max_depth else {
            self.counters.depth.fetch_add(1, Ordering::SeqCst);
            return Ok(Slot(Arc::clone(&self.counters)));
        };

        // The slot only exists once depth has actually been taken.
        self.counters
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| {
                (depth < capacity).then(|| depth + 1)
            })
            .map(|_| Slot(Arc::clone(&self.counters)))
            .map_err(|_| {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(capacity, "admission queue full, rejecting task");
                QueueError::Full { capacity }
            })
    }

    fn ensure_worker(&self) {
        if let Some(receiver) = self.pending_worker.lock().take() {
            tokio::spawn(drain(receiver, Arc::clone(&self.counters)));
        }
    }
}

impl Default for AdmissionQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

/// Drain worker (runs in its own tokio task)
async fn drain(mut receiver: mpsc::UnboundedReceiver<QueuedTask>, counters: Arc<Counters>) {
    let mut sequence: u64 = 0;

    while let Some(task) = receiver.recv().await {
        sequence += 1;
        tracing::debug!(sequence, "queued task started");

        // Own task so a panic unwinds there instead of killing the worker.
        match tokio::spawn(task).await {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(sequence, "queued task finished");
            }
            Err(err) => {
                counters.aborted.fetch_add(1, Ordering::Relaxed);
                tracing::error!(sequence, error = %err, "queued task aborted");
            }
        }
    }

    tracing::debug!("admission queue closed, drain worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Start(usize),
        End(usize),
    }

    #[tokio::test]
    async fn enqueue_returns_work_output() {
        let queue = AdmissionQueue::default();
        let value = queue.enqueue(|| async { 40 + 2 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tasks_run_one_at_a_time_in_enqueue_order() {
        let queue = AdmissionQueue::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        // Later tasks sleep less, so any overlap would reorder the log.
        let calls = (0..6).map(|i| {
            let log = Arc::clone(&log);
            queue.enqueue(move || async move {
                log.lock().push(Event::Start(i));
                tokio::time::sleep(Duration::from_millis(12 - 2 * i as u64)).await;
                log.lock().push(Event::End(i));
                i
            })
        });
        let results = join_all(calls).await;

        let expected: Vec<Event> = (0..6).flat_map(|i| [Event::Start(i), Event::End(i)]).collect();
        assert_eq!(*log.lock(), expected);
        assert_eq!(
            results.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
            (0..6).collect::<Vec<_>>()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_never_overlap() {
        let queue = Arc::new(AdmissionQueue::default());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    queue
                        .enqueue(move || async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(1)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(queue.stats().enqueued, 20);
        assert_eq!(queue.stats().depth, 0);
    }

    #[tokio::test]
    async fn failing_task_is_isolated() {
        let queue = AdmissionQueue::default();

        let (a, b, c) = tokio::join!(
            queue.enqueue(|| async { Ok::<_, String>(1) }),
            queue.enqueue(|| async { Err::<i32, _>("boom".to_string()) }),
            queue.enqueue(|| async { Ok::<_, String>(3) }),
        );

        assert_eq!(a.unwrap(), Ok(1));
        assert_eq!(b.unwrap(), Err("boom".to_string()));
        assert_eq!(c.unwrap(), Ok(3));
    }

    #[tokio::test]
    async fn panicking_task_aborts_only_its_caller() {
        let queue = AdmissionQueue::default();

        let (bad, good) = tokio::join!(
            queue.enqueue(|| async {
                if true {
                    panic!("task exploded");
                }
            }),
            queue.enqueue(|| async { "still running" }),
        );

        assert_eq!(bad.unwrap_err(), QueueError::TaskAborted);
        assert_eq!(good.unwrap(), "still running");

        // The worker records the abort before it starts the next task
        assert_eq!(queue.stats().aborted, 1);
    }

    #[tokio::test]
    async fn bounded_queue_rejects_overflow() {
        let queue = Arc::new(AdmissionQueue::new(QueueConfig::bounded(1)));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue(move || async move {
                        let _ = release_rx.await;
                        "first"
                    })
                    .await
            })
        };

        while queue.stats().depth == 0 {
            tokio::task::yield_now().await;
        }

        let second = queue.enqueue(|| async { "second" }).await;
        assert_eq!(second.unwrap_err(), QueueError::Full { capacity: 1 });
        assert_eq!(queue.stats().rejected, 1);
        // Rejection leaves the running task's slot untouched
        assert_eq!(queue.stats().depth, 1);

        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), "first");
        assert_eq!(queue.stats().depth, 0);

        // Slot is free again once the first task drained
        assert_eq!(queue.enqueue(|| async { "third" }).await.unwrap(), "third");
        assert_eq!(queue.stats().depth, 0);
    }

    #[tokio::test]
    async fn repeated_rejections_keep_depth_consistent() {
        let queue = Arc::new(AdmissionQueue::new(QueueConfig::bounded(1)));

        for round in 0..3 {
            let (release_tx, release_rx) = oneshot::channel::<()>();
            let held = {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    queue
                        .enqueue(move || async move {
                            let _ = release_rx.await;
                            round
                        })
                        .await
                })
            };
            while queue.stats().depth == 0 {
                tokio::task::yield_now().await;
            }

            for _ in 0..2 {
                assert!(queue.enqueue(|| async { 0 }).await.is_err());
                assert_eq!(queue.stats().depth, 1);
            }

            release_tx.send(()).unwrap();
            assert_eq!(held.await.unwrap().unwrap(), round);
            assert_eq!(queue.stats().depth, 0);
        }

        assert_eq!(queue.stats().rejected, 6);
    }

    #[tokio::test]
    async fn dropped_caller_does_not_stop_the_task() {
        let queue = AdmissionQueue::default();
        let (done_tx, done_rx) = oneshot::channel();

        {
            let pending = queue.enqueue(move || async move {
                let _ = done_tx.send("ran");
            });
            // Poll once so the task is admitted, then drop the caller.
            let _ = tokio::time::timeout(Duration::from_millis(0), pending).await;
        }

        assert_eq!(done_rx.await.unwrap(), "ran");
    }
}
