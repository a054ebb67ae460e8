//! # emr-intake - EMR spreadsheet intake
//!
//! emr-intake picks up the inpatient census and outpatient appointment
//! spreadsheets that the hospital EMR exports into drop folders, and
//! reconciles them into the hospital database on a daily schedule.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Receiving** files only once they are completely written
//! - **Parsing** workbooks with header detection and value normalization
//! - **Validating** rows and keeping an audit trail of every rejected row
//! - **Reconciling** patients, admissions and appointments without overwriting
//!   edits made inside the EMR
//! - **Recording** every import in a ledger that drives dedup and health checks
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (receipt, parse, validate, import, pipeline, health)
//! - [`adapters`] - External integrations (PostgreSQL, workbooks, alert webhook)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use emr_intake::config::load_config;
//! use emr_intake::core::pipeline::IntakeCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("emr-intake.toml")?;
//!     let coordinator = IntakeCoordinator::from_config(&config).await?;
//!
//!     let summary = coordinator.run_cycle().await;
//!     println!("Imported {} file(s)", summary.imported);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::IntakeError`]; the CLI maps error
//! classes onto process exit codes.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
