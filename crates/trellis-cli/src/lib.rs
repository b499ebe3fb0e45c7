//! Scenario replay and network inspection for the Trellis matching engine.

/// Command-line parsing and dispatch
pub mod cli;
/// Text output
pub mod render;
/// Scenario files and their replay
pub mod scenario;
/// Subscriber installation
pub mod tracing_setup;

pub use cli::{Cli, Command, OutputFormat};
pub use scenario::{ReplayReport, Replayer, Scenario, ScenarioEvent, StepOutcome};
