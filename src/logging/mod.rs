//! Logging and observability
//!
//! Structured logging through `tracing`, plus a few macros that keep the
//! per-file log lines consistent across the pipeline.
//!
//! # Example
//!
//! ```no_run
//! use emr_intake::logging::init_logging;
//! use emr_intake::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Scheduler started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of processing for one input file
///
/// ```no_run
/// use emr_intake::log_file_start;
/// use emr_intake::domain::DocumentKind;
/// use std::path::Path;
///
/// log_file_start!(DocumentKind::Inpatient, Path::new("/data/in/census.xlsx"));
/// ```
#[macro_export]
macro_rules! log_file_start {
    ($kind:expr, $path:expr) => {
        tracing::info!(
            kind = %$kind,
            file = %$path.display(),
            "Processing file"
        );
    };
}

/// Log the final outcome for one input file
///
/// ```no_run
/// use emr_intake::log_file_outcome;
/// use std::path::Path;
///
/// log_file_outcome!(Path::new("/data/in/census.xlsx"), "imported", "SUCCESS");
/// ```
#[macro_export]
macro_rules! log_file_outcome {
    ($path:expr, $outcome:expr, $detail:expr) => {
        tracing::info!(
            file = %$path.display(),
            outcome = $outcome,
            detail = %$detail,
            "File processed"
        );
    };
}

/// Log a row rejected during parsing or validation
///
/// ```no_run
/// use emr_intake::log_row_rejected;
///
/// log_row_rejected!(12, "PARSE_ERROR", "date of birth is invalid");
/// ```
#[macro_export]
macro_rules! log_row_rejected {
    ($row:expr, $code:expr, $message:expr) => {
        tracing::debug!(
            row = $row,
            code = %$code,
            message = %$message,
            "Row rejected"
        );
    };
}
