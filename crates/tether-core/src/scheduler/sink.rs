use crate::error::Result;
use crate::time::FrameTime;

/// Result of one frame-production attempt.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// A frame was rendered and handed to the presenter.
    Presented,
    /// Nothing to render into yet (no context or no target); not an error.
    Skipped,
}

/// Render-thread state that knows how to produce a frame.
///
/// Implementors are built on the render thread and never leave it, so they
/// need not be `Send`.
pub trait FrameSink {
    /// Called by the loop once per tick while rendering is enabled.
    fn render_frame(&mut self, time: FrameTime) -> Result<FrameOutcome>;
}
