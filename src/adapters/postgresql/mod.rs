//! PostgreSQL database integration
//!
//! Stores patients, appointments and the import ledger in the hospital
//! database.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::{PgSession, PostgreSQLAdapter};
pub use client::{PostgreSQLClient, TlsPolicy};
