//! Tether core crate.
//!
//! Owns the concurrency substrate that lets arbitrary host threads drive a
//! renderer living on exactly one dedicated render thread:
//! - `queue`: FIFO task queue with one-shot completion handles
//! - `scheduler`: the render thread and its frame-pacing loop
//! - `context`: the published render-context handle shared with callers
//!
//! Nothing in here knows about a particular 3D engine; higher layers plug the
//! engine in as the render-thread state.

pub mod context;
pub mod error;
pub mod logging;
pub mod queue;
pub mod scheduler;
pub mod time;

pub use context::{ContextHandle, ContextSlot};
pub use error::{Error, Result};
pub use queue::{Pacing, TaskHandle, TaskQueue};
pub use scheduler::{
    FrameOutcome, FrameSink, LoopStats, RenderLoop, RenderLoopConfig, ThreadState,
};
pub use time::{FrameClock, FrameTime};
