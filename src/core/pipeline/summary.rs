//! Run summary and per-file outcomes
//!
//! This module defines structures for tracking and reporting what one
//! scheduled cycle did.

use crate::core::ledger::{ImportStats, ImportStatus, UpsertStats};
use crate::domain::ImportId;
use serde::Serialize;
use std::time::Duration;

/// What happened to one discovered file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Not completely written yet; looked at again next cycle
    NotReady,
    /// Integrity check failed; moved to the error folder with no Import row
    Rejected { reason: String },
    /// Same content already imported or in progress; archived
    Duplicate,
    /// Import row finished as SUCCESS or FAIL; archived
    Imported {
        import_id: ImportId,
        status: ImportStatus,
        stats: ImportStats,
    },
    /// Processing failed; Import row (if created) marked FAIL and the file
    /// moved to the error folder
    Failed {
        import_id: Option<ImportId>,
        error: String,
    },
}

impl FileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::NotReady => "not_ready",
            FileOutcome::Rejected { .. } => "rejected",
            FileOutcome::Duplicate => "duplicate",
            FileOutcome::Imported { .. } => "imported",
            FileOutcome::Failed { .. } => "failed",
        }
    }
}

/// Summary of one scheduled cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub files_seen: usize,
    pub not_ready: usize,
    pub rejected: usize,
    pub duplicates: usize,
    /// Imports finished as SUCCESS
    pub imported: usize,
    /// Imports finished as FAIL plus files that errored out
    pub failed: usize,
    pub total_rows: u64,
    pub error_rows: u64,
    #[serde(flatten)]
    pub upsert: UpsertStats,
    #[serde(skip)]
    pub duration: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Counts one file's outcome
    pub fn record(&mut self, outcome: &FileOutcome) {
        self.files_seen += 1;
        match outcome {
            FileOutcome::NotReady => self.not_ready += 1,
            FileOutcome::Rejected { .. } => self.rejected += 1,
            FileOutcome::Duplicate => self.duplicates += 1,
            FileOutcome::Imported { status, stats, .. } => {
                if *status == ImportStatus::Success {
                    self.imported += 1;
                } else {
                    self.failed += 1;
                }
                self.total_rows += stats.total_rows;
                self.error_rows += stats.error_rows;
                self.upsert.add(&stats.upsert);
            }
            FileOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Adds another summary's counts into this one
    pub fn merge(&mut self, other: &RunSummary) {
        self.files_seen += other.files_seen;
        self.not_ready += other.not_ready;
        self.rejected += other.rejected;
        self.duplicates += other.duplicates;
        self.imported += other.imported;
        self.failed += other.failed;
        self.total_rows += other.total_rows;
        self.error_rows += other.error_rows;
        self.upsert.add(&other.upsert);
    }

    /// True when no file was rejected or failed
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.rejected == 0
    }

    /// Process exit code for a one-shot run: 0 when clean, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_successful() {
            0
        } else {
            1
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            files_seen = self.files_seen,
            not_ready = self.not_ready,
            rejected = self.rejected,
            duplicates = self.duplicates,
            imported = self.imported,
            failed = self.failed,
            total_rows = self.total_rows,
            error_rows = self.error_rows,
            created = self.upsert.created,
            updated = self.upsert.updated,
            conflicts = self.upsert.conflicts,
            skipped = self.upsert.skipped,
            duration_ms = self.duration.as_millis() as u64,
            "Intake cycle completed"
        );

        if !self.is_successful() {
            tracing::warn!(
                rejected = self.rejected,
                failed = self.failed,
                "Intake cycle completed with failures"
            );
        }
    }
}
