//! Application-level orchestration.
//!
//! This module owns run lifecycle control (start/stop) and post-run processing
//! such as committing the measurement and publishing the updated history. UI/CLI
//! layers talk to it only through command and event channels.

mod controller;
mod post_process;

pub use controller::{Controller, UiCommand};
