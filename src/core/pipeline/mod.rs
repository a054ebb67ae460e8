//! Intake pipeline orchestration
//!
//! This module contains the per-file state machine and the scheduler that
//! drives it.
//!
//! - [`coordinator`] - receipt, integrity, dedup, import and routing for each file
//! - [`routing`] - archive and error folder moves
//! - [`scheduler`] - time-of-day triggers and the daemon loop
//! - [`summary`] - per-file outcomes and the per-cycle summary

pub mod coordinator;
pub mod routing;
pub mod scheduler;
pub mod summary;

pub use coordinator::IntakeCoordinator;
pub use routing::{ensure_dirs, FileRouter};
pub use scheduler::{run_daemon, TriggerSchedule};
pub use summary::{FileOutcome, RunSummary};
