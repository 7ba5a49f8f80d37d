//! Output module for committed records and run reporting
//!
//! This module handles:
//! - The in-memory working set of committed records
//! - Periodic checkpoints and the final JSON artifact
//! - Per-category progress lines and the end-of-run summary

mod checkpoint;
mod ledger;
mod progress;
pub mod stats;
mod working_set;

pub use checkpoint::{read_artifact, write_artifact, Checkpointer};
pub use ledger::RunLedger;
pub use progress::ProgressTracker;
pub use stats::{print_summary, CategoryReport, HarvestSummary, StopReason};
pub use working_set::WorkingSet;
