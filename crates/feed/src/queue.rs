//! Asynchronous task queue for delivery work
//!
//! A fixed pool of worker threads executes submitted tasks in FIFO order.
//! Tasks are fallible: a task returning an error is re-enqueued and retried
//! up to a bounded attempt count, after which it is dropped and logged.
//! Execution is at-least-once, so tasks must be idempotent — feed delivery
//! is, because the destination tables enforce uniqueness.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, warn};

/// Error returned by a failing task to request a retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError(String);

impl TaskError {
    /// Create a task error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TaskError {}

/// Error returned when a task cannot be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The queue is at capacity
    QueueFull,
    /// The queue has been shut down
    ShutDown,
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueueFull => write!(f, "task queue is full"),
            Self::ShutDown => write!(f, "task queue has been shut down"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Queue metrics snapshot
#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    /// Number of tasks waiting in the queue
    pub queue_depth: usize,
    /// Number of tasks currently being executed by workers
    pub active_tasks: usize,
    /// Tasks that finished successfully
    pub tasks_succeeded: u64,
    /// Tasks dropped after exhausting their attempts (or panicking)
    pub tasks_failed: u64,
    /// Individual retry re-enqueues
    pub tasks_retried: u64,
    /// Number of worker threads
    pub worker_count: usize,
}

type Task = Box<dyn FnMut() -> Result<(), TaskError> + Send>;

struct TaskEnvelope {
    work: Task,
    attempts: u32,
}

struct QueueInner {
    queue: Mutex<VecDeque<TaskEnvelope>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    max_queue_depth: usize,
    max_attempts: u32,
    tasks_succeeded: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_retried: AtomicU64,
}

/// A FIFO worker pool with bounded per-task retry
pub struct TaskQueue {
    inner: Arc<QueueInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl TaskQueue {
    /// Create a queue with the given worker count, queue capacity, and
    /// per-task attempt budget (attempts, not retries: 3 means two retries).
    ///
    /// Workers are named `plume-task-0`, `plume-task-1`, etc.
    pub fn new(num_threads: usize, max_queue_depth: usize, max_attempts: u32) -> Self {
        let inner = Arc::new(QueueInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            max_queue_depth,
            max_attempts: max_attempts.max(1),
            tasks_succeeded: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_retried: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let inner_clone = Arc::clone(&inner);
            let handle = std::thread::Builder::new()
                .name(format!("plume-task-{}", i))
                .spawn(move || worker_loop(&inner_clone))
                .expect("failed to spawn task queue worker thread");
            workers.push(handle);
        }

        Self {
            inner,
            workers: Mutex::new(workers),
            num_threads,
        }
    }

    /// Submit a task for asynchronous execution
    ///
    /// The task runs at least once and at most `max_attempts` times.
    pub fn submit(
        &self,
        work: impl FnMut() -> Result<(), TaskError> + Send + 'static,
    ) -> Result<(), SubmitError> {
        // Reject after shutdown — workers have been joined, the task would
        // never run
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(SubmitError::ShutDown);
        }

        if self.inner.queue_depth.load(Ordering::Acquire) >= self.inner.max_queue_depth {
            return Err(SubmitError::QueueFull);
        }

        let envelope = TaskEnvelope {
            work: Box::new(work),
            attempts: 0,
        };

        {
            let mut queue = self.inner.queue.lock();
            queue.push_back(envelope);
            self.inner.queue_depth.fetch_add(1, Ordering::Release);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until all queued and in-flight tasks (including retries) have
    /// completed. Workers remain running after drain returns.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(Ordering::Acquire) > 0
            || self.inner.active_tasks.load(Ordering::Acquire) > 0
        {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Shut down the queue: workers drain remaining tasks, then exit and
    /// are joined. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);

        // Lock the queue before notifying to prevent lost-wakeup: a worker
        // between its shutdown check and condvar wait holds this lock, so
        // acquiring it guarantees the worker is either already in wait()
        // (our notify wakes it) or hasn't checked shutdown yet.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Snapshot of queue metrics
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queue_depth: self.inner.queue_depth.load(Ordering::Relaxed),
            active_tasks: self.inner.active_tasks.load(Ordering::Relaxed),
            tasks_succeeded: self.inner.tasks_succeeded.load(Ordering::Relaxed),
            tasks_failed: self.inner.tasks_failed.load(Ordering::Relaxed),
            tasks_retried: self.inner.tasks_retried.load(Ordering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decrements `active_tasks` and notifies drain waiters on drop, so the
/// bookkeeping stays correct even if a task panics.
struct ActiveTaskGuard<'a> {
    inner: &'a QueueInner,
}

impl Drop for ActiveTaskGuard<'_> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_tasks.fetch_sub(1, Ordering::Release);

        // Lock the queue before notifying: drain() holds this lock while
        // checking its condition and calling wait(), so acquiring it ensures
        // drain either re-checks or is already waiting for our notify.
        if prev_active == 1 && self.inner.queue_depth.load(Ordering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &QueueInner) {
    loop {
        let mut envelope = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(envelope) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, Ordering::Release);
                    inner.active_tasks.fetch_add(1, Ordering::Release);
                    break envelope;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let guard = ActiveTaskGuard { inner };

        // Execute outside the lock. catch_unwind keeps a panicking task from
        // killing the worker; a panicked task is failed, not retried.
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (envelope.work)()));
        envelope.attempts += 1;

        match outcome {
            Ok(Ok(())) => {
                inner.tasks_succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(err)) if envelope.attempts < inner.max_attempts => {
                warn!(
                    attempt = envelope.attempts,
                    max_attempts = inner.max_attempts,
                    %err,
                    "task failed, re-enqueueing for retry"
                );
                inner.tasks_retried.fetch_add(1, Ordering::Relaxed);
                // Retries bypass backpressure: the task was already admitted.
                // Re-enqueue before the guard drops so drain() cannot observe
                // an empty-and-idle queue mid-retry.
                let mut queue = inner.queue.lock();
                queue.push_back(envelope);
                inner.queue_depth.fetch_add(1, Ordering::Release);
                drop(queue);
                inner.work_ready.notify_one();
            }
            Ok(Err(err)) => {
                error!(
                    attempts = envelope.attempts,
                    %err,
                    "task dropped after exhausting its attempts"
                );
                inner.tasks_failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(panic) => {
                error!(
                    "task panicked: {:?}",
                    panic
                        .downcast_ref::<&str>()
                        .copied()
                        .unwrap_or("(non-string panic)")
                );
                inner.tasks_failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        drop(guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_submit_and_drain() {
        let queue = TaskQueue::new(2, 4096, 3);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let c = Arc::clone(&counter);
            queue
                .submit(move || {
                    c.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .unwrap();
        }

        queue.drain();
        assert_eq!(counter.load(Ordering::Relaxed), 10);
        assert_eq!(queue.stats().tasks_succeeded, 10);
        queue.shutdown();
    }

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new(1, 4096, 3);

        // Block the single worker so submissions pile up in order
        let barrier = Arc::new(Barrier::new(2));
        let b = Arc::clone(&barrier);
        queue
            .submit(move || {
                b.wait();
                Ok(())
            })
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));

        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let o = Arc::clone(&order);
            queue
                .submit(move || {
                    o.lock().push(i);
                    Ok(())
                })
                .unwrap();
        }

        barrier.wait();
        queue.drain();
        assert_eq!(order.lock().clone(), vec![0, 1, 2, 3, 4]);
        queue.shutdown();
    }

    #[test]
    fn test_failing_task_retried_until_success() {
        let queue = TaskQueue::new(1, 4096, 5);
        let calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&calls);
        queue
            .submit(move || {
                if c.fetch_add(1, Ordering::Relaxed) < 2 {
                    Err(TaskError::new("transient"))
                } else {
                    Ok(())
                }
            })
            .unwrap();

        queue.drain();
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        let stats = queue.stats();
        assert_eq!(stats.tasks_succeeded, 1);
        assert_eq!(stats.tasks_retried, 2);
        assert_eq!(stats.tasks_failed, 0);
        queue.shutdown();
    }

    #[test]
    fn test_task_dropped_after_attempt_budget() {
        let queue = TaskQueue::new(1, 4096, 3);
        let calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&calls);
        queue
            .submit(move || {
                c.fetch_add(1, Ordering::Relaxed);
                Err(TaskError::new("permanent"))
            })
            .unwrap();

        queue.drain();
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        let stats = queue.stats();
        assert_eq!(stats.tasks_failed, 1);
        assert_eq!(stats.tasks_retried, 2);
        assert_eq!(stats.tasks_succeeded, 0);
        queue.shutdown();
    }

    #[test]
    fn test_backpressure() {
        let queue = TaskQueue::new(1, 2, 3);

        // Block the worker so submitted tasks stay queued
        let barrier = Arc::new(Barrier::new(2));
        let b = Arc::clone(&barrier);
        queue
            .submit(move || {
                b.wait();
                Ok(())
            })
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));

        queue.submit(|| Ok(())).unwrap();
        queue.submit(|| Ok(())).unwrap();
        assert_eq!(queue.submit(|| Ok(())), Err(SubmitError::QueueFull));

        barrier.wait();
        queue.drain();
        queue.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let queue = TaskQueue::new(2, 4096, 3);
        queue.shutdown();
        assert_eq!(queue.submit(|| Ok(())), Err(SubmitError::ShutDown));
    }

    #[test]
    fn test_shutdown_drains_remaining() {
        let queue = TaskQueue::new(1, 4096, 3);

        let barrier = Arc::new(Barrier::new(2));
        let b = Arc::clone(&barrier);
        queue
            .submit(move || {
                b.wait();
                Ok(())
            })
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let c = Arc::clone(&counter);
            queue
                .submit(move || {
                    c.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .unwrap();
        }

        barrier.wait();
        queue.shutdown();
        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_panicking_task_does_not_hang_drain() {
        let queue = TaskQueue::new(2, 4096, 3);
        let counter = Arc::new(AtomicUsize::new(0));

        queue
            .submit(|| -> Result<(), TaskError> {
                panic!("intentional test panic");
            })
            .unwrap();
        for _ in 0..5 {
            let c = Arc::clone(&counter);
            queue
                .submit(move || {
                    c.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .unwrap();
        }

        queue.drain();
        assert_eq!(counter.load(Ordering::Relaxed), 5);
        let stats = queue.stats();
        assert_eq!(stats.tasks_succeeded, 5);
        assert_eq!(stats.tasks_failed, 1);
        queue.shutdown();
    }

    #[test]
    fn test_concurrent_submits() {
        let queue = Arc::new(TaskQueue::new(2, 4096, 3));
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let q = Arc::clone(&queue);
            let c = Arc::clone(&counter);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let c = Arc::clone(&c);
                    q.submit(move || {
                        c.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    })
                    .unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        queue.drain();
        assert_eq!(counter.load(Ordering::Relaxed), 400);
        assert_eq!(queue.stats().tasks_succeeded, 400);
        queue.shutdown();
    }

    #[test]
    fn test_drain_returns_when_idle() {
        let queue = TaskQueue::new(2, 4096, 3);
        queue.drain();
        queue.shutdown();
        // repeated shutdown must not panic or deadlock
        queue.shutdown();
    }
}
