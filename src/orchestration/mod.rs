//! Sequencing of copy cycles: the pure `cycle::step` and the async runner
//! that feeds it.

pub mod cycle;
pub mod runner;

pub use cycle::{step, CopyState, CycleOutcome, Observation};
pub use runner::{Orchestrator, SharedStatus, StatusBoard};
