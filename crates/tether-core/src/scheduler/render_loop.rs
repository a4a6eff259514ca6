use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use super::config::RenderLoopConfig;
use super::sink::{FrameOutcome, FrameSink};
use crate::context::ContextSlot;
use crate::error::{Error, Result};
use crate::queue::{panic_message, TaskHandle, TaskQueue};
use crate::time::FrameClock;

/// Lifecycle of the render thread.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ThreadState {
    /// Thread is up, no render context published.
    Idle,
    /// A render context is live. Rendering may be on or off.
    Running,
    /// Stop requested; no further tasks will run.
    Stopping,
    /// Thread has been joined.
    Joined,
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct LoopStats {
    pub frames_rendered: u64,
    pub tasks_executed: u64,
    pub tasks_cancelled: u64,
}

/// Owner of the render thread.
///
/// Construct one per renderer and hand a reference to every caller; there is
/// no process-wide instance. Dropping it stops and joins the thread.
pub struct RenderLoop<S: FrameSink + 'static> {
    queue: Arc<TaskQueue<S>>,
    slot: Arc<ContextSlot>,
    frames: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    joined: AtomicBool,
}

impl<S: FrameSink + 'static> RenderLoop<S> {
    /// Spawns the render thread.
    ///
    /// `init` runs on the new thread and builds the state every task and
    /// frame operates on; tasks submitted before it returns simply queue up.
    pub fn spawn<I>(config: RenderLoopConfig, init: I) -> Result<Self>
    where
        I: FnOnce(&Arc<ContextSlot>) -> S + Send + 'static,
    {
        let queue = Arc::new(TaskQueue::new(config.frame_interval, config.rendering));
        let slot = Arc::new(ContextSlot::new());
        let frames = Arc::new(AtomicU64::new(0));

        let worker = {
            let queue = Arc::clone(&queue);
            let slot = Arc::clone(&slot);
            let frames = Arc::clone(&frames);
            let idle_wait = config.idle_wait;

            thread::Builder::new()
                .name(config.thread_name.clone())
                .spawn(move || {
                    // Whatever ends this thread, callers must not hang on a
                    // queue nobody drains.
                    let _stop = StopOnExit(&*queue);
                    log::info!("render thread started");
                    let state = init(&slot);
                    run(&queue, &frames, idle_wait, state);
                    log::info!("render thread exiting");
                })
                .map_err(Error::ThreadSpawn)?
        };

        let worker_id = worker.thread().id();
        queue.bind_consumer(worker_id);
        log::debug!(
            "render loop spawned (thread `{}`, interval {:?}, rendering {})",
            config.thread_name,
            config.frame_interval,
            config.rendering
        );

        Ok(Self {
            queue,
            slot,
            frames,
            worker: Mutex::new(Some(worker)),
            worker_id,
            joined: AtomicBool::new(false),
        })
    }

    /// Queues `f` and returns a handle to await its result.
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.queue.submit(f)
    }

    /// Queues `f` without waiting. Failures only reach the log.
    pub fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> Result<()> + Send + 'static,
    {
        self.queue.post(f)
    }

    /// Queues `f` and blocks until it has run.
    pub fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submit(f)?.wait()
    }

    /// Toggles frame production. Takes effect on the next loop tick.
    pub fn set_rendering(&self, rendering: bool) {
        if self.queue.set_rendering(rendering) != rendering {
            log::debug!("rendering {}", if rendering { "enabled" } else { "disabled" });
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.queue.pacing().rendering
    }

    /// Sets the target frame interval; returns the applied value.
    pub fn set_frame_interval(&self, interval: Duration) -> Duration {
        let applied = self.queue.set_frame_interval(interval);
        log::debug!("frame interval set to {applied:?}");
        applied
    }

    pub fn frame_interval(&self) -> Duration {
        self.queue.pacing().frame_interval
    }

    pub fn context_slot(&self) -> &Arc<ContextSlot> {
        &self.slot
    }

    pub fn is_render_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    pub fn state(&self) -> ThreadState {
        if self.joined.load(Ordering::Acquire) {
            ThreadState::Joined
        } else if self.queue.is_stopped() {
            ThreadState::Stopping
        } else if self.slot.current().is_some() {
            ThreadState::Running
        } else {
            ThreadState::Idle
        }
    }

    pub fn stats(&self) -> LoopStats {
        LoopStats {
            frames_rendered: self.frames.load(Ordering::Relaxed),
            tasks_executed: self.queue.executed(),
            tasks_cancelled: self.queue.cancelled(),
        }
    }

    /// Stops the loop and joins the render thread. Idempotent.
    ///
    /// Pending tasks are cancelled; a task already running finishes first.
    /// Called from the render thread itself (from inside a task), this only
    /// signals the stop; the join happens on a later call or on drop.
    pub fn stop(&self) {
        let cancelled = self.queue.stop();
        if cancelled > 0 {
            log::debug!("cancelled {cancelled} pending render tasks");
        }

        if self.is_render_thread() {
            log::warn!("stop requested from the render thread; join deferred");
            return;
        }

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(worker) = worker {
            if worker.join().is_err() {
                log::error!("render thread terminated by a panic");
            }
            self.joined.store(true, Ordering::Release);
            log::info!("render thread joined");
        }
    }
}

impl<S: FrameSink + 'static> Drop for RenderLoop<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

struct StopOnExit<'a, S: 'static>(&'a TaskQueue<S>);

impl<S: 'static> Drop for StopOnExit<'_, S> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

fn run<S: FrameSink + 'static>(
    queue: &TaskQueue<S>,
    frames: &AtomicU64,
    idle_wait: Option<Duration>,
    mut state: S,
) {
    let mut clock = FrameClock::new();
    let mut last_frame: Option<Instant> = None;
    let mut failed_streak: u32 = 0;

    while !queue.is_stopped() {
        let pacing = queue.pacing();

        if !pacing.rendering {
            if last_frame.take().is_some() {
                clock.reset();
            }
            queue.drain_one(&mut state, idle_wait);
            continue;
        }

        // A frame is due one interval after the previous one. The interval is
        // re-read every tick, so a shorter one applies immediately.
        let now = Instant::now();
        let due = last_frame.map_or(now, |t| t + pacing.frame_interval);
        if now >= due {
            last_frame = Some(now);
            produce_frame(queue, frames, &mut clock, &mut failed_streak, &mut state);
        }

        // At most one task per tick; the wait ends when the next frame is due,
        // so a stream of tasks neither starves frames nor multiplies them.
        let next = last_frame.map_or(now, |t| t + pacing.frame_interval);
        queue.drain_one(&mut state, Some(next.saturating_duration_since(Instant::now())));
    }
}

fn produce_frame<S: FrameSink + 'static>(
    queue: &TaskQueue<S>,
    frames: &AtomicU64,
    clock: &mut FrameClock,
    failed_streak: &mut u32,
    state: &mut S,
) {
    let time = clock.tick();
    match panic::catch_unwind(AssertUnwindSafe(|| state.render_frame(time))) {
        Ok(Ok(FrameOutcome::Presented)) => {
            frames.fetch_add(1, Ordering::Relaxed);
            if *failed_streak > 0 {
                log::info!("frame production recovered after {failed_streak} failed frames");
                *failed_streak = 0;
            }
        }
        Ok(Ok(FrameOutcome::Skipped)) => {}
        Ok(Err(e)) => {
            *failed_streak += 1;
            if *failed_streak == 1 {
                log::warn!("frame {} failed: {e}", time.frame_index);
            } else {
                log::debug!("frame {} failed: {e}", time.frame_index);
            }
        }
        Err(payload) => {
            log::error!(
                "frame {} panicked: {}; rendering disabled",
                time.frame_index,
                panic_message(payload.as_ref())
            );
            queue.set_rendering(false);
        }
    }
}
