//! Render-context handle publication.
//!
//! The context itself never leaves the render thread. Other threads only see
//! a `ContextHandle`, an opaque id published through a `ContextSlot` once the
//! context is fully constructed and withdrawn when it is destroyed.

mod slot;

pub use slot::{ContextHandle, ContextSlot};
