//! Domain models and types for the intake pipeline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`FileHash`], [`ImportId`])
//! - **Document kinds** ([`DocumentKind`])
//! - **Row types** ([`ParsedRow`], [`RowError`], [`Partition`]) shared by parsers,
//!   validators and importers
//! - **Parsed records** ([`InpatientRecord`], [`OutpatientRecord`])
//! - **Persistent entities** ([`Patient`], [`Appointment`], ...)
//! - **Error types** ([`IntakeError`], [`ParseError`]) and the [`Result`] alias
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, IntakeError>`]. Structural
//! spreadsheet failures are a distinct [`ParseError`] so the pipeline can tell
//! "no header row" apart from a database outage without string matching:
//!
//! ```rust
//! use emr_intake::domain::{IntakeError, ParseError};
//!
//! let err: IntakeError = ParseError::HeaderNotFound { scanned_rows: 10 }.into();
//! assert!(matches!(err, IntakeError::Parse(ParseError::HeaderNotFound { .. })));
//! ```

pub mod entities;
pub mod errors;
pub mod ids;
pub mod kinds;
pub mod records;
pub mod result;
pub mod rows;

pub use entities::{
    Appointment, AppointmentFields, AppointmentStatus, ClinicRoom, Doctor, IdentityConflict,
    IdentitySnapshot, ImportErrorRecord, NewIdentityConflict, NewImportError, NewPatient, Patient,
    RecordSource,
};
pub use errors::{IntakeError, ParseError};
pub use ids::{FileHash, ImportId};
pub use kinds::DocumentKind;
pub use records::{InpatientRecord, OutpatientRecord};
pub use result::Result;
pub use rows::{ErrorCode, ParsedRow, Partition, RawRow, RowError, RowOutcome, ValidRow};
