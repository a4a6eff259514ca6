use std::time::Duration;

/// 60 Hz.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_nanos(16_666_667);

/// Render loop configuration.
#[derive(Debug, Clone)]
pub struct RenderLoopConfig {
    /// Name given to the render thread (shows up in logs and debuggers).
    pub thread_name: String,

    /// Target duration between frames while rendering is enabled.
    pub frame_interval: Duration,

    /// Whether frame production starts enabled.
    pub rendering: bool,

    /// Upper bound on the idle wait while rendering is disabled.
    ///
    /// `None` waits until a task or a pacing change arrives.
    pub idle_wait: Option<Duration>,
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            thread_name: "tether-render".to_string(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            rendering: false,
            idle_wait: None,
        }
    }
}
