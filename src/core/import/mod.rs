//! Importers
//!
//! - [`inpatient`] reconciles census rows into Patient, recording identity
//!   conflicts
//! - [`outpatient`] reconciles appointment rows, honoring internal edits
//! - [`errors`] writes rejected rows to the audit trail

pub mod errors;
pub mod inpatient;
pub mod outpatient;

pub use errors::persist_errors;
pub use inpatient::upsert_patients;
pub use outpatient::upsert_appointments;
