//! Logging setup.
//!
//! All crates in the workspace log through the `log` facade. This module only
//! installs the `env_logger` backend, with the emitting thread's name on every
//! line so render-thread activity is easy to tell apart from host threads.

mod init;

pub use init::{init_logging, LoggingConfig};
