pub mod cli;
pub mod engine;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod physics;
pub mod storage;
pub mod text_summary;
#[cfg(feature = "tui")]
mod tui;
