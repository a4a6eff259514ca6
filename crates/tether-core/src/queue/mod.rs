//! Render task queue.
//!
//! A `Task` is a boxed closure over the render-thread state plus an optional
//! one-shot reply channel. The queue is strictly FIFO: a single consumer (the
//! render thread) pops from the head, any number of producers push to the
//! tail.

mod task;
mod task_queue;

pub use task::TaskHandle;
pub use task_queue::{Pacing, TaskQueue, MIN_FRAME_INTERVAL};

pub(crate) use task::panic_message;
