use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use super::handle::Task;

/// Per-worker holding pen for pending tasks.
///
/// One mutex-guarded deque plus a condvar. Producers append at the back,
/// consumers (the owning worker and thieves alike) take from the front, so a
/// single pair of FIFO ends covers both paths.
pub struct TaskQueue {
    inner: Mutex<Inner>,
    ready: Condvar,
}

struct Inner {
    pending: VecDeque<Task>,
    stopped: bool,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                stopped: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append a task and wake one waiter. Blocks only on the lock itself.
    pub fn push(&self, task: Task) {
        {
            let mut inner = self.inner.lock();
            inner.pending.push_back(task);
        }
        self.ready.notify_one();
    }

    /// Non-blocking push. Hands the task back when the lock is contended so
    /// the caller can try the next queue instead.
    pub fn try_push(&self, task: Task) -> Result<(), Task> {
        match self.inner.try_lock() {
            Some(mut inner) => {
                inner.pending.push_back(task);
                drop(inner);
                self.ready.notify_one();
                Ok(())
            }
            None => Err(task),
        }
    }

    /// Blocking pop. Suspends the calling thread until a task arrives or the
    /// queue is shut down. After shutdown the remaining tasks are drained
    /// first; only then does this return `None`.
    pub fn pop(&self) -> Option<Task> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(task) = inner.pending.pop_front() {
                return Some(task);
            }
            if inner.stopped {
                return None;
            }
            self.ready.wait(&mut inner);
        }
    }

    /// Stealing primitive: never blocks. `None` on lock contention as well as
    /// on an empty queue, so a thief can immediately move on to the next peer.
    pub fn try_pop(&self) -> Option<Task> {
        let mut inner = self.inner.try_lock()?;
        inner.pending.pop_front()
    }

    /// Mark the queue stopped and release every waiter. Pending tasks stay
    /// poppable until drained. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            inner.stopped = true;
        }
        self.ready.notify_all();
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
