//! Workbook integrity check
//!
//! A file passes when it exists, carries a spreadsheet extension, opens as a
//! workbook and has at least one row beyond the header. The sheet read here
//! is handed on to the parser so the workbook is decoded only once.

use crate::adapters::spreadsheet::{read_first_sheet, Sheet};
use crate::domain::{IntakeError, Result};
use std::path::{Path, PathBuf};

/// Extensions accepted by the integrity check
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Outcome of the integrity check
#[derive(Debug, Clone, PartialEq)]
pub enum Integrity {
    Passed(Sheet),
    Failed(String),
}

impl Integrity {
    pub fn is_passed(&self) -> bool {
        matches!(self, Integrity::Passed(_))
    }
}

/// Checks that `path` is a readable workbook with data
pub fn check_integrity(path: &Path) -> Integrity {
    if !path.is_file() {
        return Integrity::Failed(format!("file not found: {}", path.display()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        return Integrity::Failed(format!(
            "unsupported extension '.{extension}', expected one of: {}",
            ACCEPTED_EXTENSIONS.join(", ")
        ));
    }

    let sheet = match read_first_sheet(path) {
        Ok(sheet) => sheet,
        Err(e) => return Integrity::Failed(e.to_string()),
    };

    if sheet.height() < 2 {
        return Integrity::Failed("workbook has no data rows".to_string());
    }

    Integrity::Passed(sheet)
}

/// [`check_integrity`] on the blocking thread pool
///
/// # Errors
///
/// Only when the blocking task panics or is cancelled; a bad workbook is an
/// [`Integrity::Failed`] value.
pub async fn check_integrity_blocking(path: PathBuf) -> Result<Integrity> {
    tokio::task::spawn_blocking(move || check_integrity(&path))
        .await
        .map_err(|e| IntakeError::Other(format!("Integrity check task failed: {e}")))
}
