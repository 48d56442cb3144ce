use super::{
    errors::SplitError,
    handle::{JoinHandle, Task},
    model::PoolMetrics,
    queue::TaskQueue,
    result::SplitResult,
};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use futures::channel::oneshot;
use log::{debug, error};
use parking_lot::Mutex;

/// Thread pool configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker thread count, fixed for the pool's entire lifetime.
    pub num_threads: usize,
    /// Multiple of the worker count that `spawn` samples with non-blocking
    /// pushes before it falls back to a blocking push.
    pub submit_oversample: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            submit_oversample: 1.5,
        }
    }
}

/// Fixed-size work-stealing pool of OS threads.
///
/// Each worker owns one [`TaskQueue`] and prefers it, but scans every peer
/// queue with non-blocking steals before parking. Tasks enter either through
/// [`spawn`](ThreadPool::spawn) (round-robin, fire-and-forget) or
/// [`split`](ThreadPool::split) (one chunk per worker, joinable).
///
/// Dropping the pool shuts every queue down and joins the workers; tasks
/// enqueued before the drop are still executed. Submitting while another
/// thread drops the same pool is impossible in safe code, since submission
/// borrows the pool shared while `Drop` needs it exclusively.
pub struct ThreadPool {
    shared: Arc<Shared>,
    threads: Vec<thread::JoinHandle<()>>,
}

struct Shared {
    queues: Vec<TaskQueue>,
    next: AtomicUsize,
    submit_window: usize,
    queued_tasks: AtomicUsize,
    total_submitted: AtomicUsize,
    completed_tasks: AtomicUsize,
    failed_tasks: AtomicUsize,
    stolen_tasks: AtomicUsize,
    idle_workers: AtomicUsize,
}

/// Shared fan-in state of one `split` call: a countdown over the chunks plus
/// the promise fulfilled by whichever chunk brings it to zero.
struct JoinRecord {
    chunks: usize,
    remaining: AtomicUsize,
    failed: AtomicUsize,
    sender: Mutex<Option<oneshot::Sender<SplitResult>>>,
}

impl JoinRecord {
    fn chunk_done(&self, panicked: bool) {
        if panicked {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        // Only the decrement that observes 1 -> 0 may fulfill the promise.
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        let failed = self.failed.load(Ordering::Relaxed);
        let result = if failed == 0 {
            Ok(())
        } else {
            Err(SplitError::Panic(format!(
                "{} of {} chunks panicked",
                failed, self.chunks
            )))
        };
        if let Some(sender) = self.sender.lock().take() {
            let _ = sender.send(result);
        }
    }
}

impl ThreadPool {
    /// Pool sized to the available hardware parallelism.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self::with_config(Config {
            num_threads,
            ..Config::default()
        })
    }

    pub fn with_config(config: Config) -> Self {
        let n = config.num_threads;
        assert!(n > 0, "no threads");

        let submit_window = (config.submit_oversample * n as f32).ceil() as usize;
        let shared = Arc::new(Shared {
            queues: (0..n).map(|_| TaskQueue::new()).collect(),
            next: AtomicUsize::new(0),
            submit_window: submit_window.max(1),
            queued_tasks: AtomicUsize::new(0),
            total_submitted: AtomicUsize::new(0),
            completed_tasks: AtomicUsize::new(0),
            failed_tasks: AtomicUsize::new(0),
            stolen_tasks: AtomicUsize::new(0),
            idle_workers: AtomicUsize::new(0),
        });

        let threads = (0..n)
            .map(|index| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || shared.worker_loop(index))
            })
            .collect();

        // Startup barrier: an empty split still lands one no-op chunk on
        // every queue, so waiting for it means the workers are live and the
        // queues drained before the caller gets the pool.
        let _ = shared.split(0, 0, |_| {}).wait();

        Self { shared, threads }
    }

    pub fn num_threads(&self) -> usize {
        self.shared.queues.len()
    }

    /// Fire-and-forget submission.
    ///
    /// Round-robins over the queues with non-blocking pushes to dodge
    /// contended locks; in the worst case it blocks for exactly one lock
    /// acquisition. The task runs exactly once on some worker.
    #[inline]
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Box::new(f));
    }

    /// Apply `func` to every index in `[first, last)` in parallel.
    ///
    /// The range is cut into one contiguous chunk per worker (the last chunk
    /// may be short or empty) and each chunk is pushed directly to that
    /// worker's queue, bypassing the round-robin path. Indices within a chunk
    /// run in ascending order; chunks run concurrently in no particular
    /// order. The returned handle resolves only after every index has been
    /// visited exactly once.
    ///
    /// A panicking chunk still counts down, so the handle always resolves;
    /// the panic is reported through the handle's result.
    pub fn split<F>(&self, first: usize, last: usize, func: F) -> JoinHandle
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.shared.split(first, last, func)
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        let shared = &self.shared;
        let idle = shared.idle_workers.load(Ordering::Relaxed);
        PoolMetrics {
            active_workers: shared.queues.len().saturating_sub(idle),
            idle_workers: idle,
            queued_tasks: shared.queued_tasks.load(Ordering::Relaxed),
            total_submitted: shared.total_submitted.load(Ordering::Relaxed),
            completed_tasks: shared.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: shared.failed_tasks.load(Ordering::Relaxed),
            stolen_tasks: shared.stolen_tasks.load(Ordering::Relaxed),
        }
    }

    /// Explicit teardown; identical to dropping the pool.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        debug!("shutting down {} workers", self.threads.len());
        for queue in &self.shared.queues {
            queue.shutdown();
        }
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                error!("worker thread panicked outside a task");
            }
        }
    }
}

impl Shared {
    fn worker_loop(&self, index: usize) {
        debug!("worker {} started", index);
        let n = self.queues.len();

        loop {
            // Scan our own queue first, then every peer exactly once,
            // without blocking anywhere.
            let mut found = None;
            for j in 0..n {
                if let Some(task) = self.queues[(index + j) % n].try_pop() {
                    if j > 0 {
                        self.stolen_tasks.fetch_add(1, Ordering::Relaxed);
                    }
                    found = Some(task);
                    break;
                }
            }

            // Nothing anywhere: park on our own queue until work shows up
            // there or the pool shuts down.
            let task = match found {
                Some(task) => task,
                None => {
                    self.idle_workers.fetch_add(1, Ordering::Relaxed);
                    let popped = self.queues[index].pop();
                    self.idle_workers.fetch_sub(1, Ordering::Relaxed);
                    match popped {
                        Some(task) => task,
                        None => break,
                    }
                }
            };

            self.queued_tasks.fetch_sub(1, Ordering::Relaxed);
            self.run(task);
        }

        debug!("worker {} finished", index);
    }

    /// A panicking task takes down only itself: the unwind is caught here,
    /// counted, logged, and the worker moves on.
    fn run(&self, task: Task) {
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(()) => {
                self.completed_tasks.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                self.failed_tasks.fetch_add(1, Ordering::Relaxed);
                error!("task panicked: {}", panic_message(&payload));
            }
        }
    }

    fn submit(&self, task: Task) {
        let n = self.queues.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % n;

        self.total_submitted.fetch_add(1, Ordering::Relaxed);
        self.queued_tasks.fetch_add(1, Ordering::Relaxed);

        let mut task = task;
        for k in 0..self.submit_window {
            match self.queues[(start + k) % n].try_push(task) {
                Ok(()) => return,
                Err(rejected) => task = rejected,
            }
        }
        // Every sampled queue was contended; the plain push cannot fail.
        self.queues[start].push(task);
    }

    fn split<F>(self: &Arc<Self>, first: usize, last: usize, func: F) -> JoinHandle
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let n = self.queues.len();
        let len = last.saturating_sub(first);
        let chunk = len.div_ceil(n);

        let (sender, receiver) = oneshot::channel();
        let record = Arc::new(JoinRecord {
            chunks: n,
            remaining: AtomicUsize::new(n),
            failed: AtomicUsize::new(0),
            sender: Mutex::new(Some(sender)),
        });
        let func = Arc::new(func);

        self.total_submitted.fetch_add(n, Ordering::Relaxed);
        self.queued_tasks.fetch_add(n, Ordering::Relaxed);

        for (i, queue) in self.queues.iter().enumerate() {
            let lo = (first + i * chunk).min(last);
            let hi = (lo + chunk).min(last);
            let func = Arc::clone(&func);
            let record = Arc::clone(&record);

            // Chunks bypass the round-robin path: queue i gets chunk i, one
            // chunk per worker regardless of how stealing plays out.
            queue.push(Box::new(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    for index in lo..hi {
                        func(index);
                    }
                }));
                // The countdown must advance even on panic, or the caller's
                // handle would never resolve.
                record.chunk_done(outcome.is_err());
                if let Err(payload) = outcome {
                    panic::resume_unwind(payload);
                }
            }));
        }

        JoinHandle::new(receiver)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "opaque panic payload"
    }
}
