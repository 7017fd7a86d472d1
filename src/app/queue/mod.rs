pub mod classifier;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use tracing::warn;

use crate::app::error::AppError;
use crate::app::models::{LaneStatus, QueueStatus};

pub use classifier::{classify, LaneKind};

pub const FAST_MAX_CONCURRENCY: usize = 2;
pub const NORMAL_MAX_CONCURRENCY: usize = 2;
pub const BULK_MAX_CONCURRENCY: usize = 4;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Completion side of a submitted operation. `wait` yields the operation's
/// own result exactly once; a job lost to a panicking closure or a shut-down
/// lane surfaces as `ERR_SYSTEM` instead of hanging the caller.
pub struct JobHandle<T> {
    receiver: mpsc::Receiver<Result<T, AppError>>,
}

impl<T> JobHandle<T> {
    pub fn wait(self) -> Result<T, AppError> {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(AppError::system(
                "Operation was dropped before completing",
                "",
            ))
        })
    }
}

/// One named bounded-concurrency channel: a FIFO job queue drained by
/// `max_concurrency` worker threads. Admission order is strict FIFO; the
/// in-flight count cannot exceed the worker count by construction.
pub struct Lane {
    name: &'static str,
    max_concurrency: usize,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    queued: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    workers: Vec<JoinHandle<()>>,
}

impl Lane {
    pub fn new(name: &'static str, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let queued = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(max_concurrency);
        for index in 0..max_concurrency {
            let receiver = Arc::clone(&receiver);
            let queued = Arc::clone(&queued);
            let running = Arc::clone(&running);
            let handle = std::thread::Builder::new()
                .name(format!("lane-{name}-{index}"))
                .spawn(move || loop {
                    let job = {
                        let guard = match receiver.lock() {
                            Ok(guard) => guard,
                            Err(_) => break,
                        };
                        guard.recv()
                    };
                    match job {
                        Ok(job) => {
                            queued.fetch_sub(1, Ordering::SeqCst);
                            running.fetch_add(1, Ordering::SeqCst);
                            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                                warn!("lane operation panicked");
                            }
                            running.fetch_sub(1, Ordering::SeqCst);
                        }
                        Err(_) => break,
                    }
                })
                .expect("spawn lane worker");
            workers.push(handle);
        }

        Self {
            name,
            max_concurrency,
            sender: Mutex::new(Some(sender)),
            queued,
            running,
            workers,
        }
    }

    /// Appends an operation to the lane's FIFO. The returned handle resolves
    /// with the operation's success or failure; bookkeeping happens
    /// unconditionally either way.
    pub fn submit<T, F>(&self, operation: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AppError> + Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            let result = operation();
            let _ = result_tx.send(result);
        });

        self.queued.fetch_add(1, Ordering::SeqCst);
        let delivered = match self.sender.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(sender) => sender.send(job).is_ok(),
                None => false,
            },
            Err(_) => false,
        };
        if !delivered {
            // Lane already shut down; the dropped result sender makes
            // `wait` report ERR_SYSTEM.
            self.queued.fetch_sub(1, Ordering::SeqCst);
        }

        JobHandle {
            receiver: result_rx,
        }
    }

    pub fn status(&self) -> LaneStatus {
        LaneStatus {
            name: self.name.to_string(),
            queue_length: self.queued.load(Ordering::SeqCst),
            concurrency: self.running.load(Ordering::SeqCst),
            max_concurrency: self.max_concurrency,
        }
    }
}

impl Drop for Lane {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// The three-lane dispatcher. Constructed once at the composition root and
/// shared by handle; holds no global state.
pub struct CommandDispatcher {
    fast: Lane,
    normal: Lane,
    bulk: Lane,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::with_capacities(
            FAST_MAX_CONCURRENCY,
            NORMAL_MAX_CONCURRENCY,
            BULK_MAX_CONCURRENCY,
        )
    }

    pub fn with_capacities(fast: usize, normal: usize, bulk: usize) -> Self {
        Self {
            fast: Lane::new("fast", fast),
            normal: Lane::new("normal", normal),
            bulk: Lane::new("bulk", bulk),
        }
    }

    pub fn lane(&self, kind: LaneKind) -> &Lane {
        match kind {
            LaneKind::Fast => &self.fast,
            LaneKind::Normal => &self.normal,
            LaneKind::Bulk => &self.bulk,
        }
    }

    pub fn submit<T, F>(&self, kind: LaneKind, operation: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AppError> + Send + 'static,
    {
        self.lane(kind).submit(operation)
    }

    /// Routes by classifying the rendered command text. For callers that
    /// already know their intent, `submit` with an explicit lane is the
    /// better entry point.
    pub fn submit_classified<T, F>(&self, command: &str, operation: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AppError> + Send + 'static,
    {
        self.submit(classify(command), operation)
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            fast: self.fast.status(),
            normal: self.normal.status(),
            bulk: self.bulk.status(),
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    // Workers release their slot just after delivering the result, so poll
    // briefly instead of asserting on the instant after `wait` returns.
    fn assert_idle(status_of: impl Fn() -> LaneStatus) {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let status = status_of();
            if status.concurrency == 0 && status.queue_length == 0 {
                return;
            }
            if Instant::now() > deadline {
                panic!(
                    "lane did not go idle: concurrency={} queue_length={}",
                    status.concurrency, status.queue_length
                );
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn lane_never_exceeds_max_concurrency() {
        let lane = Lane::new("test", 2);

        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let running = Arc::clone(&running);
            let max_running = Arc::clone(&max_running);
            handles.push(lane.submit(move || {
                let current = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(current, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        for handle in handles {
            handle.wait().expect("operation");
        }

        assert!(max_running.load(Ordering::SeqCst) <= 2);
        assert_idle(|| lane.status());
    }

    #[test]
    fn single_slot_lane_admits_in_submission_order() {
        let lane = Lane::new("test", 1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for label in ["A", "B", "C"] {
            let order = Arc::clone(&order);
            handles.push(lane.submit(move || {
                order.lock().expect("order lock").push(label);
                Ok(())
            }));
        }

        for handle in handles {
            handle.wait().expect("operation");
        }

        assert_eq!(*order.lock().expect("order lock"), vec!["A", "B", "C"]);
    }

    #[test]
    fn completion_frees_the_slot_for_queued_work() {
        let lane = Lane::new("test", 1);

        let first_done = Arc::new(Mutex::new(None::<Instant>));
        let second_started = Arc::new(Mutex::new(None::<Instant>));

        let first_done_in = Arc::clone(&first_done);
        let slow = lane.submit(move || {
            std::thread::sleep(Duration::from_millis(100));
            *first_done_in.lock().expect("lock") = Some(Instant::now());
            Ok(())
        });
        let second_started_in = Arc::clone(&second_started);
        let fast = lane.submit(move || {
            *second_started_in.lock().expect("lock") = Some(Instant::now());
            Ok(())
        });

        slow.wait().expect("slow");
        fast.wait().expect("fast");

        let done = first_done.lock().expect("lock").expect("first finished");
        let started = second_started
            .lock()
            .expect("lock")
            .expect("second started");
        assert!(started >= done);
        assert!(started.duration_since(done) < Duration::from_secs(1));
    }

    #[test]
    fn failures_propagate_and_still_free_the_slot() {
        let lane = Lane::new("test", 1);

        let err = lane
            .submit::<(), _>(|| Err(AppError::dependency("device exploded", "trace-1")))
            .wait()
            .expect_err("expected failure");
        assert_eq!(err.code, "ERR_DEPENDENCY");
        assert_eq!(err.trace_id, "trace-1");

        // The failed operation must have released its slot.
        lane.submit(|| Ok(42u32)).wait().expect("second operation");
        assert_idle(|| lane.status());
    }

    #[test]
    fn panicking_operation_reports_instead_of_hanging() {
        let lane = Lane::new("test", 1);

        let err = lane
            .submit::<(), _>(|| panic!("boom"))
            .wait()
            .expect_err("expected error");
        assert_eq!(err.code, "ERR_SYSTEM");

        // Worker survives the panic and keeps draining the queue.
        assert_eq!(lane.submit(|| Ok(7u32)).wait().expect("next"), 7);
    }

    #[test]
    fn status_reports_queued_and_running_counts() {
        let dispatcher = CommandDispatcher::with_capacities(1, 1, 1);

        let release = Arc::new(AtomicUsize::new(0));
        let release_in = Arc::clone(&release);
        let blocker = dispatcher.submit(LaneKind::Bulk, move || {
            while release_in.load(Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        });
        let queued = dispatcher.submit(LaneKind::Bulk, || Ok(()));

        // Give the worker a moment to admit the blocker.
        std::thread::sleep(Duration::from_millis(50));
        let status = dispatcher.status();
        assert_eq!(status.bulk.concurrency, 1);
        assert_eq!(status.bulk.queue_length, 1);
        assert_eq!(status.bulk.max_concurrency, 1);
        assert_eq!(status.fast.concurrency, 0);
        assert_eq!(status.normal.concurrency, 0);

        release.store(1, Ordering::SeqCst);
        blocker.wait().expect("blocker");
        queued.wait().expect("queued");

        assert_idle(|| dispatcher.status().bulk);
    }

    #[test]
    fn dispatcher_routes_by_classification() {
        let dispatcher = CommandDispatcher::new();
        dispatcher
            .submit_classified("devices -l", || Ok(()))
            .wait()
            .expect("fast");
        let status = dispatcher.status();
        assert_eq!(status.fast.name, "fast");
        assert_eq!(status.fast.max_concurrency, FAST_MAX_CONCURRENCY);
        assert_eq!(status.normal.max_concurrency, NORMAL_MAX_CONCURRENCY);
        assert_eq!(status.bulk.max_concurrency, BULK_MAX_CONCURRENCY);
    }
}
