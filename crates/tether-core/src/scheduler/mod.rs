//! Render thread + frame-pacing loop.
//!
//! The loop alternates between producing a frame (when rendering is enabled)
//! and running at most one queued task, waiting on the queue for at most one
//! frame interval in between. With rendering disabled it idles on the queue
//! until work or a pacing change arrives.

mod config;
mod render_loop;
mod sink;

pub use config::{RenderLoopConfig, DEFAULT_FRAME_INTERVAL};
pub use render_loop::{LoopStats, RenderLoop, ThreadState};
pub use sink::{FrameOutcome, FrameSink};
