//! Database abstraction layer
//!
//! Trait-based storage so the pipeline runs against PostgreSQL in production
//! and against the in-memory store in dry runs and tests.

pub mod factory;
pub mod traits;

pub use factory::{create_store_and_ledger, StoreHandles};
pub use traits::{ImportLedger, IntakeSession, IntakeStore};
