//! Frame timing.
//!
//! The render loop owns one `FrameClock` and ticks it once per produced frame;
//! the resulting `FrameTime` is handed to the frame sink.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
