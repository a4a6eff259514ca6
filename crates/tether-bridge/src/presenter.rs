//! Frame hand-off to the host compositor.

use crate::types::FrameInfo;

/// Receives every frame the render thread presents.
///
/// Runs on the render thread right after the engine finished the frame;
/// implementations should only notify the host (e.g. "texture frame
/// available") and return.
pub trait FramePresenter: Send {
    fn frame_ready(&mut self, frame: &FrameInfo);
}

/// Presenter that ignores frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPresenter;

impl FramePresenter for NoopPresenter {
    fn frame_ready(&mut self, _frame: &FrameInfo) {}
}

impl<F> FramePresenter for F
where
    F: FnMut(&FrameInfo) + Send,
{
    fn frame_ready(&mut self, frame: &FrameInfo) {
        self(frame)
    }
}
