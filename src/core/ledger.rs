//! Import ledger records
//!
//! One Import row per file-processing attempt. The row is created in
//! `PROCESSING` before any entity is touched and moved to `SUCCESS` or `FAIL`
//! once the file is done, so a crash mid-file leaves a visible trace. The
//! content fingerprint on the row is what makes re-delivery a no-op.

use crate::domain::{DocumentKind, FileHash, ImportId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Status of one import attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Processing,
    Success,
    Fail,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Processing => "PROCESSING",
            ImportStatus::Success => "SUCCESS",
            ImportStatus::Fail => "FAIL",
        }
    }

    /// Statuses that block reprocessing of the same content
    pub fn blocks_reprocessing(&self) -> bool {
        matches!(self, ImportStatus::Processing | ImportStatus::Success)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROCESSING" => Ok(ImportStatus::Processing),
            "SUCCESS" => Ok(ImportStatus::Success),
            "FAIL" => Ok(ImportStatus::Fail),
            other => Err(format!(
                "Unknown import status '{other}'. Must be one of: PROCESSING, SUCCESS, FAIL"
            )),
        }
    }
}

/// Values for creating an Import row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImport {
    pub file_path: String,
    pub file_hash: FileHash,
    pub kind: DocumentKind,
}

/// Stored Import row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: ImportId,
    pub file_path: String,
    pub file_hash: FileHash,
    pub file_type: DocumentKind,
    pub status: ImportStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats_json: Option<Value>,
}

/// Entity-level counts returned by an importer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertStats {
    pub created: u64,
    pub updated: u64,
    pub conflicts: u64,
    pub skipped: u64,
}

impl UpsertStats {
    pub fn add(&mut self, other: &UpsertStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.conflicts += other.conflicts;
        self.skipped += other.skipped;
    }
}

/// Outcome statistics stored in `Import.statsJson`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    #[serde(flatten)]
    pub upsert: UpsertStats,
    pub total_rows: u64,
    pub error_rows: u64,
}

impl ImportStats {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

/// Stats payload for a file that parsed to zero rows
pub fn no_data_stats() -> Value {
    json!({"total": 0, "message": "no data rows"})
}

/// Stats payload for a file that failed with an error
pub fn failure_stats(error: &str) -> Value {
    json!({ "error": error })
}
