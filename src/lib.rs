//! Scans repositories for Prometheus metrics and OpenTelemetry tracing usage,
//! generates deterministic anchored edit plans and applies them.
pub mod applier;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod forge;
pub mod generator;
pub mod path_helpers;
pub mod repo;
pub mod scanner;

pub use error::{CopilotError, Result};

#[cfg(test)]
pub mod test_helpers;
