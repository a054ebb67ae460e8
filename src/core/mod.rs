//! Core business logic for the intake pipeline.
//!
//! # Modules
//!
//! - [`receipt`] - Decides whether a dropped file is completely written
//! - [`verification`] - Workbook integrity and content fingerprints
//! - [`parse`] - Header detection and row normalization per document kind
//! - [`validate`] - Business rules partitioning rows into valid and rejected
//! - [`import`] - Reconciliation of valid rows into the entity tables
//! - [`handler`] - One parse/validate/upsert contract per document kind
//! - [`ledger`] - Import ledger records and statistics
//! - [`pipeline`] - Per-file state machine, routing and scheduling
//! - [`health`] - Ledger-based health check with alerting
//!
//! # Intake Workflow
//!
//! For every file in a watched folder, in name order:
//!
//! 1. **Receipt**: skip files that are still being written
//! 2. **Integrity**: quarantine anything that is not a readable workbook
//! 3. **Dedup**: archive content that was already imported
//! 4. **Ledger**: record a `PROCESSING` import
//! 5. **Parse and validate**: rejected rows go to the audit trail
//! 6. **Upsert**: reconcile the rest, recording conflicts
//! 7. **Finish**: mark the import `SUCCESS` or `FAIL` and archive the file
//!
//! # Example
//!
//! ```rust,no_run
//! use emr_intake::config::load_config;
//! use emr_intake::core::pipeline::IntakeCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("emr-intake.toml")?;
//! let coordinator = IntakeCoordinator::from_config(&config).await?;
//!
//! let summary = coordinator.run_cycle().await;
//! println!("Imported: {}", summary.imported);
//! println!("Failed: {}", summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod handler;
pub mod health;
pub mod import;
pub mod ledger;
pub mod parse;
pub mod pipeline;
pub mod receipt;
pub mod validate;
pub mod verification;
