//! External system integrations.
//!
//! - [`database`] - Storage traits and the store factory
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - In-memory implementation for dry runs and tests
//! - [`spreadsheet`] - Workbook reading
//! - [`alert`] - Operational alert webhook
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the pipeline can
//! be driven against the in-memory store in tests:
//!
//! ```rust
//! use emr_intake::adapters::database::{ImportLedger, IntakeStore};
//! use emr_intake::adapters::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! let store = MemoryStore::new();
//! let entities: Arc<dyn IntakeStore> = Arc::new(store.clone());
//! let ledger: Arc<dyn ImportLedger> = Arc::new(store);
//! # let _ = (entities, ledger);
//! ```

pub mod alert;
pub mod database;
pub mod memory;
pub mod postgresql;
pub mod spreadsheet;
