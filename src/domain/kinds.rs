//! Document kinds handled by the pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The shape of an EMR export file
///
/// Each kind has its own folder, header table, validator and importer.
/// The stored form (`INPATIENT`/`OUTPATIENT`) is what lands in the Import
/// ledger's `fileType` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    /// Inpatient census
    Inpatient,
    /// Outpatient appointment list
    Outpatient,
}

impl DocumentKind {
    /// Processing order within one scheduled run
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Inpatient, DocumentKind::Outpatient];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Inpatient => "INPATIENT",
            DocumentKind::Outpatient => "OUTPATIENT",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INPATIENT" => Ok(DocumentKind::Inpatient),
            "OUTPATIENT" => Ok(DocumentKind::Outpatient),
            other => Err(format!("Unknown document kind: {other}")),
        }
    }
}
