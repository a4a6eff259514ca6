use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use super::task::{Task, TaskHandle};
use crate::error::{Error, Result};

/// Smallest accepted frame interval. Shorter requests are raised to this.
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Scheduler inputs read once per loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub rendering: bool,
    pub frame_interval: Duration,
}

struct Inner<S> {
    pending: VecDeque<Task<S>>,
    pacing: Pacing,
    stopped: bool,
    next_id: u64,
}

/// Thread-safe FIFO of render tasks with a wake signal.
///
/// Everything except the stop flag lives behind one mutex. The wake
/// condition is signalled on every enqueue, on pacing changes and on stop,
/// so the consumer never sleeps through something it has to react to.
pub struct TaskQueue<S> {
    inner: Mutex<Inner<S>>,
    wake: Condvar,
    stopped: AtomicBool,
    consumer: OnceLock<ThreadId>,
    executed: AtomicU64,
    cancelled: AtomicU64,
}

impl<S: 'static> TaskQueue<S> {
    pub fn new(frame_interval: Duration, rendering: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                pacing: Pacing {
                    rendering,
                    frame_interval: frame_interval.max(MIN_FRAME_INTERVAL),
                },
                stopped: false,
                next_id: 0,
            }),
            wake: Condvar::new(),
            stopped: AtomicBool::new(false),
            consumer: OnceLock::new(),
            executed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        }
    }

    /// Records the consuming thread. Handles created afterwards refuse to
    /// block on that thread.
    pub fn bind_consumer(&self, id: ThreadId) {
        let _ = self.consumer.set(id);
    }

    pub fn is_consumer_thread(&self) -> bool {
        self.consumer.get() == Some(&thread::current().id())
    }

    /// Appends a task whose result can be awaited through the returned handle.
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let id = self.enqueue(move |id| Task::with_reply(id, f, tx))?;
        Ok(TaskHandle::new(id, rx, self.consumer.get().copied()))
    }

    /// Appends a fire-and-forget task. Its failure is only logged.
    pub fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> Result<()> + Send + 'static,
    {
        self.enqueue(move |id| Task::detached(id, f)).map(|_| ())
    }

    fn enqueue(&self, make: impl FnOnce(u64) -> Task<S>) -> Result<u64> {
        let mut inner = self.lock();
        if inner.stopped {
            return Err(Error::QueueStopped);
        }
        inner.next_id += 1;
        let task = make(inner.next_id);
        let id = task.id();
        inner.pending.push_back(task);
        self.wake.notify_one();
        Ok(id)
    }

    /// Runs the head task on the calling thread, if there is one.
    ///
    /// With an empty queue, waits up to `timeout` (forever for `None`) for a
    /// wake signal and returns false without running anything, so the caller
    /// can re-evaluate pacing. Returns false immediately once stopped.
    pub fn drain_one(&self, state: &mut S, timeout: Option<Duration>) -> bool {
        let task = {
            let mut inner = self.lock();
            if inner.stopped {
                return false;
            }
            match inner.pending.pop_front() {
                Some(task) => task,
                None => {
                    match timeout {
                        Some(t) => drop(
                            self.wake
                                .wait_timeout(inner, t)
                                .unwrap_or_else(PoisonError::into_inner),
                        ),
                        None => drop(self.wake.wait(inner).unwrap_or_else(PoisonError::into_inner)),
                    }
                    return false;
                }
            }
        };

        task.run(state);
        self.executed.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn pacing(&self) -> Pacing {
        self.lock().pacing
    }

    /// Returns the previous value.
    pub fn set_rendering(&self, rendering: bool) -> bool {
        let mut inner = self.lock();
        let prev = std::mem::replace(&mut inner.pacing.rendering, rendering);
        self.wake.notify_one();
        prev
    }

    /// Returns the interval actually applied (raised to `MIN_FRAME_INTERVAL`).
    pub fn set_frame_interval(&self, interval: Duration) -> Duration {
        let interval = interval.max(MIN_FRAME_INTERVAL);
        self.lock().pacing.frame_interval = interval;
        self.wake.notify_one();
        interval
    }

    /// Stops the queue: later submissions fail with `QueueStopped`, pending
    /// tasks are dropped (their waiters see `Cancelled`), and the consumer is
    /// woken. A task already being executed is unaffected.
    ///
    /// Returns how many pending tasks were cancelled.
    pub fn stop(&self) -> usize {
        let dropped = {
            let mut inner = self.lock();
            inner.stopped = true;
            self.stopped.store(true, Ordering::Release);
            std::mem::take(&mut inner.pending)
        };
        self.wake.notify_all();

        // Task closures run arbitrary drop code; keep that outside the lock.
        let n = dropped.len();
        drop(dropped);
        self.cancelled.fetch_add(n as u64, Ordering::Relaxed);
        n
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
