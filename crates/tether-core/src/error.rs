use std::fmt;

use thiserror::Error;

/// Errors produced by the render queue and by operations routed through it.
#[derive(Debug, Error)]
pub enum Error {
    /// A task was submitted after the queue stopped.
    #[error("render queue is stopped")]
    QueueStopped,

    /// The queue stopped before the task got a chance to run.
    #[error("task was cancelled before it ran")]
    Cancelled,

    /// A bounded wait elapsed before the task completed.
    #[error("timed out waiting for task completion")]
    Timeout,

    /// Waiting on a task from the render thread would block the only thread
    /// able to run it.
    #[error("cannot wait on a task from the render thread")]
    WouldDeadlock,

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// The render context was never created or has already been destroyed.
    #[error("render context is not available")]
    ContextUnavailable,

    #[error("failed to load resource `{name}`: {reason}")]
    ResourceLoadFailed { name: String, reason: String },

    #[error("gpu operation `{op}` failed: {reason}")]
    GpuOperationFailed { op: &'static str, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to spawn render thread")]
    ThreadSpawn(#[source] std::io::Error),
}

impl Error {
    pub fn gpu(op: &'static str, reason: impl fmt::Display) -> Self {
        Self::GpuOperationFailed {
            op,
            reason: reason.to_string(),
        }
    }

    pub fn resource(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ResourceLoadFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for errors caused by queue shutdown rather than by the task itself.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::QueueStopped | Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
