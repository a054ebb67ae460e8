//! File verification
//!
//! - [`checksum`] computes the content fingerprint used for deduplication
//! - [`integrity`] checks that a file is a readable workbook with data

pub mod checksum;
pub mod integrity;

pub use checksum::file_fingerprint;
pub use integrity::{check_integrity, check_integrity_blocking, Integrity};
