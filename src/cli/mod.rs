//! CLI-specific functionality
//!
//! Argument parsing, configuration discovery and the offline simulator.

pub mod args;
pub mod config;
pub mod script;

pub use args::{Args, Commands};
pub use config::ConfigDiscovery;
pub use script::{SimulationReport, SimulationScript, TimelineEntry};
