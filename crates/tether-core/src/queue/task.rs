use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crate::error::{Error, Result};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// One unit of work bound for the render thread.
///
/// Dropping a task without running it drops its reply sender, which the
/// waiting `TaskHandle` observes as `Cancelled`.
pub(crate) struct Task<S> {
    id: u64,
    job: Job<S>,
}

impl<S: 'static> Task<S> {
    pub(crate) fn with_reply<F, R>(id: u64, f: F, reply: SyncSender<Result<R>>) -> Self
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let job: Job<S> = Box::new(move |state: &mut S| {
            let outcome = run_guarded(id, || f(state));
            // The submitter may have dropped its handle already.
            let _ = reply.send(outcome);
        });
        Self { id, job }
    }

    pub(crate) fn detached<F>(id: u64, f: F) -> Self
    where
        F: FnOnce(&mut S) -> Result<()> + Send + 'static,
    {
        let job: Job<S> = Box::new(move |state: &mut S| {
            if let Ok(Err(e)) = run_guarded(id, || f(state)) {
                log::error!("fire-and-forget task #{id} failed: {e}");
            }
        });
        Self { id, job }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn run(self, state: &mut S) {
        (self.job)(state)
    }
}

fn run_guarded<T>(id: u64, f: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let msg = panic_message(payload.as_ref());
        log::error!("task #{id} panicked: {msg}");
        Error::TaskPanicked(msg)
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Completion handle for a submitted task.
///
/// A handle yields its result once; the `wait*` calls after a successful one
/// report `Cancelled`.
#[derive(Debug)]
pub struct TaskHandle<R> {
    id: u64,
    rx: Receiver<Result<R>>,
    render_thread: Option<ThreadId>,
}

impl<R> TaskHandle<R> {
    pub(crate) fn new(id: u64, rx: Receiver<Result<R>>, render_thread: Option<ThreadId>) -> Self {
        Self {
            id,
            rx,
            render_thread,
        }
    }

    /// Submission sequence number of the task.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Blocks until the task ran (or was cancelled by shutdown).
    pub fn wait(self) -> Result<R> {
        self.guard_thread()?;
        match self.rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Cancelled),
        }
    }

    /// Like `wait`, but gives up with `Timeout` after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<R> {
        self.guard_thread()?;
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Cancelled),
        }
    }

    /// Non-blocking poll. `None` while the task is still pending.
    pub fn try_take(&self) -> Option<Result<R>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::Cancelled)),
        }
    }

    fn guard_thread(&self) -> Result<()> {
        if self.render_thread == Some(thread::current().id()) {
            return Err(Error::WouldDeadlock);
        }
        Ok(())
    }
}
