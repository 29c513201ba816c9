//! Session orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::Session;
pub use stats::StreamStats;
