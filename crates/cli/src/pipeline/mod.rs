//! Stream session orchestration module.

mod orchestrator;
mod signals;
mod stats;

pub use orchestrator::{SessionConfig, StreamSession};
pub use signals::{ShutdownSignal, ToggleSignal};
pub use stats::SessionStats;
