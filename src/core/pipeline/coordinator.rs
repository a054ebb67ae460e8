//! Intake coordinator - main orchestrator for the intake process
//!
//! Drives each discovered file through receipt, integrity, deduplication,
//! parse, validate and upsert, writing the Import ledger at every major
//! transition and routing the file to the archive or error folder.
//!
//! Database work for one file is split into discrete commits: the
//! `PROCESSING` row, then the rejected rows, then the entity upserts, then
//! the final status. A crash in between leaves a `PROCESSING` row behind,
//! which keeps the same content from being imported twice.

use crate::adapters::database::{
    create_store_and_ledger, ImportLedger, IntakeSession, IntakeStore,
};
use crate::adapters::spreadsheet::Sheet;
use crate::config::{FoldersConfig, IntakeConfig};
use crate::core::handler::{DocumentHandler, InpatientHandler, OutpatientHandler};
use crate::core::import::persist_errors;
use crate::core::ledger::{
    failure_stats, no_data_stats, ImportStats, ImportStatus, NewImport, UpsertStats,
};
use crate::core::pipeline::routing::{ensure_dirs, FileRouter};
use crate::core::pipeline::summary::{FileOutcome, RunSummary};
use crate::core::receipt::{ReceiptDetector, ReceiptMode};
use crate::core::verification::{check_integrity_blocking, file_fingerprint, Integrity};
use crate::domain::{DocumentKind, ImportId, Result};
use crate::{log_file_outcome, log_file_start};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Extension of the files picked up from the watched folders
pub const INPUT_EXTENSION: &str = "xlsx";

/// Intake coordinator
pub struct IntakeCoordinator {
    store: Arc<dyn IntakeStore>,
    ledger: Arc<dyn ImportLedger>,
    receipt: ReceiptDetector,
    router: FileRouter,
    folders: FoldersConfig,
}

impl IntakeCoordinator {
    /// Create a coordinator over existing storage handles
    pub fn new(
        config: &IntakeConfig,
        store: Arc<dyn IntakeStore>,
        ledger: Arc<dyn ImportLedger>,
    ) -> Self {
        Self {
            store,
            ledger,
            receipt: ReceiptDetector::new(ReceiptMode::from_config(&config.receipt)),
            router: FileRouter::from_config(&config.folders),
            folders: config.folders.clone(),
        }
    }

    /// Create a coordinator from configuration
    ///
    /// Connects to the configured store, applies the schema and creates the
    /// watched and destination folders.
    pub async fn from_config(config: &IntakeConfig) -> Result<Self> {
        let (store, ledger) = create_store_and_ledger(config).await?;
        store.test_connection().await?;
        store.ensure_schema().await?;
        ensure_dirs(&config.folders).await?;
        Ok(Self::new(config, store, ledger))
    }

    /// Run every watched folder once, inpatient then outpatient
    pub async fn run_cycle(&self) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::new();

        for kind in DocumentKind::ALL {
            let folder_summary = match kind {
                DocumentKind::Inpatient => {
                    self.run_folder(&InpatientHandler, &self.folders.inpatient)
                        .await
                }
                DocumentKind::Outpatient => {
                    self.run_folder(&OutpatientHandler, &self.folders.outpatient)
                        .await
                }
            };
            summary.merge(&folder_summary);
        }

        let summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        summary
    }

    /// Process every input file in `folder` in sorted name order
    ///
    /// A failing file is logged and counted; it never stops the rest.
    pub async fn run_folder<H: DocumentHandler>(&self, handler: &H, folder: &Path) -> RunSummary {
        let mut summary = RunSummary::new();
        let kind = handler.kind();

        let files = match list_input_files(folder).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(
                    kind = %kind,
                    folder = %folder.display(),
                    error = %e,
                    "Cannot read watched folder"
                );
                return summary;
            }
        };

        if files.is_empty() {
            tracing::info!(kind = %kind, folder = %folder.display(), "No files to process");
            return summary;
        }

        tracing::info!(kind = %kind, count = files.len(), "Files discovered");

        for path in files {
            let outcome = match self.process_file(handler, &path).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "File processing failed");
                    FileOutcome::Failed {
                        import_id: None,
                        error: e.to_string(),
                    }
                }
            };
            summary.record(&outcome);
        }

        summary
    }

    /// Drive one file through the pipeline
    pub async fn process_file<H: DocumentHandler>(
        &self,
        handler: &H,
        path: &Path,
    ) -> Result<FileOutcome> {
        log_file_start!(handler.kind(), path);

        if !self.receipt.is_ready(path).await {
            log_file_outcome!(path, "not_ready", "receipt not complete");
            return Ok(FileOutcome::NotReady);
        }

        let sheet = match check_integrity_blocking(path.to_path_buf()).await? {
            Integrity::Passed(sheet) => sheet,
            Integrity::Failed(reason) => {
                self.router.quarantine(path, &reason).await?;
                log_file_outcome!(path, "rejected", reason);
                return Ok(FileOutcome::Rejected { reason });
            }
        };

        let file_hash = file_fingerprint(path)?;
        if self.ledger.is_duplicate(&file_hash).await? {
            tracing::warn!(
                file = %path.display(),
                hash = %file_hash.short(),
                "Content already imported, archiving without processing"
            );
            self.router.archive(path, Local::now().naive_local()).await?;
            log_file_outcome!(path, "duplicate", file_hash.short());
            return Ok(FileOutcome::Duplicate);
        }

        let import_id = self
            .ledger
            .create_import(&NewImport {
                file_path: path.display().to_string(),
                file_hash,
                kind: handler.kind(),
            })
            .await?;

        match self.import_sheet(handler, import_id, &sheet).await {
            Ok((status, stats)) => {
                let payload = if stats.total_rows == 0 {
                    no_data_stats()
                } else {
                    stats.to_json()
                };
                self.ledger.finish_import(import_id, status, &payload).await?;
                self.router.archive(path, Local::now().naive_local()).await?;
                log_file_outcome!(path, "imported", status);
                Ok(FileOutcome::Imported {
                    import_id,
                    status,
                    stats,
                })
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(
                    file = %path.display(),
                    import_id = %import_id,
                    error = %error,
                    "Import failed"
                );
                if let Err(ledger_err) = self
                    .ledger
                    .finish_import(import_id, ImportStatus::Fail, &failure_stats(&error))
                    .await
                {
                    tracing::error!(
                        import_id = %import_id,
                        error = %ledger_err,
                        "Failed to mark import as failed"
                    );
                }
                self.router.quarantine(path, &error).await?;
                log_file_outcome!(path, "failed", error);
                Ok(FileOutcome::Failed {
                    import_id: Some(import_id),
                    error,
                })
            }
        }
    }

    /// Parse, validate, record rejected rows and upsert the rest
    async fn import_sheet<H: DocumentHandler>(
        &self,
        handler: &H,
        import_id: ImportId,
        sheet: &Sheet,
    ) -> Result<(ImportStatus, ImportStats)> {
        let rows = handler.parse(sheet)?;
        if rows.is_empty() {
            tracing::info!(import_id = %import_id, "No data rows");
            return Ok((ImportStatus::Success, ImportStats::default()));
        }

        let partition = handler.validate(rows, Local::now().date_naive());
        tracing::info!(
            import_id = %import_id,
            valid = partition.valid.len(),
            rejected = partition.errors.len(),
            "Rows validated"
        );

        if !partition.errors.is_empty() {
            let mut session = self.store.begin().await?;
            match persist_errors(session.as_mut(), import_id, &partition.errors).await {
                Ok(_) => session.commit().await?,
                Err(e) => {
                    discard(session).await;
                    return Err(e);
                }
            }
        }

        let upsert = if partition.valid.is_empty() {
            UpsertStats::default()
        } else {
            let mut session = self.store.begin().await?;
            match handler
                .upsert(session.as_mut(), import_id, &partition.valid)
                .await
            {
                Ok(stats) => {
                    session.commit().await?;
                    stats
                }
                Err(e) => {
                    discard(session).await;
                    return Err(e);
                }
            }
        };

        let status = if partition.all_rejected() {
            ImportStatus::Fail
        } else {
            ImportStatus::Success
        };

        Ok((
            status,
            ImportStats {
                upsert,
                total_rows: partition.total() as u64,
                error_rows: partition.errors.len() as u64,
            },
        ))
    }
}

async fn discard(session: Box<dyn IntakeSession>) {
    if let Err(e) = session.rollback().await {
        tracing::warn!(error = %e, "Rollback failed");
    }
}

/// `*.xlsx` files directly inside `folder`, sorted by name
pub async fn list_input_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_input = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(INPUT_EXTENSION));
        if is_input && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::config::{
        ApplicationConfig, DatabaseTarget, HealthConfig, LoggingConfig, ReceiptConfig,
        ScheduleConfig,
    };
    use crate::core::receipt::marker_path;
    use crate::domain::ErrorCode;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        config: IntakeConfig,
        store: MemoryStore,
        coordinator: IntakeCoordinator,
    }

    impl Fixture {
        async fn new() -> Self {
            let root = TempDir::new().unwrap();
            let config = IntakeConfig {
                application: ApplicationConfig::default(),
                folders: FoldersConfig {
                    inpatient: root.path().join("inpatient"),
                    outpatient: root.path().join("outpatient"),
                    lab: None,
                    error: root.path().join("error"),
                    archive: root.path().join("archive"),
                },
                receipt: ReceiptConfig::default(),
                schedule: ScheduleConfig::default(),
                database_target: DatabaseTarget::Memory,
                postgresql: None,
                health: HealthConfig::default(),
                logging: LoggingConfig::default(),
            };
            ensure_dirs(&config.folders).await.unwrap();
            let store = MemoryStore::new();
            let coordinator =
                IntakeCoordinator::new(&config, Arc::new(store.clone()), Arc::new(store.clone()));
            Self {
                root,
                config,
                store,
                coordinator,
            }
        }

        fn drop_inpatient(&self, name: &str, rows: &[[&str; 5]]) -> PathBuf {
            let path = self.config.folders.inpatient.join(name);
            let mut workbook = Workbook::new();
            let sheet = workbook.add_worksheet();
            let header = ["환자번호", "환자명", "생년월일", "성별", "입원일"];
            for (col, value) in header.iter().enumerate() {
                sheet.write_string(0, col as u16, *value).unwrap();
            }
            for (r, row) in rows.iter().enumerate() {
                for (col, value) in row.iter().enumerate() {
                    sheet.write_string(r as u32 + 1, col as u16, *value).unwrap();
                }
            }
            workbook.save(&path).unwrap();
            std::fs::write(marker_path(&path), b"").unwrap();
            path
        }

        fn dir_names(&self, dir: &str) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(self.root.path().join(dir))
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    const KIM: [&str; 5] = ["P1", "Kim", "1980-01-01", "M", "2024-01-01"];

    #[tokio::test]
    async fn test_imports_and_archives_file() {
        let f = Fixture::new().await;
        let path = f.drop_inpatient("census.xlsx", &[KIM]);

        let outcome = f.coordinator.process_file(&InpatientHandler, &path).await.unwrap();

        let FileOutcome::Imported { status, stats, .. } = outcome else {
            panic!("expected import, got {outcome:?}");
        };
        assert_eq!(status, ImportStatus::Success);
        assert_eq!(stats.upsert.created, 1);
        assert!(!path.exists());
        assert_eq!(f.dir_names("archive").len(), 1);
        assert!(f.dir_names("inpatient").is_empty());

        let imports = f.store.imports().unwrap();
        assert_eq!(imports[0].status, ImportStatus::Success);
        assert_eq!(imports[0].stats_json.as_ref().unwrap()["totalRows"], 1);
    }

    #[tokio::test]
    async fn test_missing_marker_leaves_file_alone() {
        let f = Fixture::new().await;
        let path = f.drop_inpatient("census.xlsx", &[KIM]);
        std::fs::remove_file(marker_path(&path)).unwrap();

        let outcome = f.coordinator.process_file(&InpatientHandler, &path).await.unwrap();

        assert_eq!(outcome, FileOutcome::NotReady);
        assert!(path.exists());
        assert!(f.store.imports().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_quarantined_without_import() {
        let f = Fixture::new().await;
        let path = f.config.folders.inpatient.join("broken.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        std::fs::write(marker_path(&path), b"").unwrap();

        let outcome = f.coordinator.process_file(&InpatientHandler, &path).await.unwrap();

        assert!(matches!(outcome, FileOutcome::Rejected { .. }));
        assert_eq!(f.dir_names("error"), vec!["broken.xlsx", "broken.xlsx.done"]);
        assert!(f.store.imports().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_rows_rejected_marks_import_fail() {
        let f = Fixture::new().await;
        let path = f.drop_inpatient(
            "census.xlsx",
            &[["P1", "Kim", "not a date", "M", "2024-01-01"]],
        );

        let outcome = f.coordinator.process_file(&InpatientHandler, &path).await.unwrap();

        assert!(matches!(
            outcome,
            FileOutcome::Imported { status: ImportStatus::Fail, .. }
        ));
        let tables = f.store.snapshot().unwrap();
        assert!(tables.patients.is_empty());
        assert_eq!(tables.import_errors.len(), 1);
        assert_eq!(tables.import_errors[0].error_code, ErrorCode::ParseError);
        assert_eq!(f.dir_names("archive").len(), 1);
    }

    #[tokio::test]
    async fn test_missing_header_fails_import_and_quarantines() {
        let f = Fixture::new().await;
        let path = f.config.folders.inpatient.join("census.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "something").unwrap();
        sheet.write_string(1, 0, "else").unwrap();
        workbook.save(&path).unwrap();
        std::fs::write(marker_path(&path), b"").unwrap();

        let outcome = f.coordinator.process_file(&InpatientHandler, &path).await.unwrap();

        let FileOutcome::Failed { import_id, error } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(import_id.is_some());
        assert!(error.contains("header row not found"));
        let imports = f.store.imports().unwrap();
        assert_eq!(imports[0].status, ImportStatus::Fail);
        assert!(imports[0].stats_json.as_ref().unwrap()["error"]
            .as_str()
            .unwrap()
            .contains("header"));
        assert_eq!(f.dir_names("error"), vec!["census.xlsx", "census.xlsx.done"]);
    }

    #[tokio::test]
    async fn test_file_without_data_rows_succeeds_and_archives() {
        let f = Fixture::new().await;
        let path = f.config.folders.inpatient.join("empty.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "입원환자 현황").unwrap();
        let header = ["환자번호", "환자명", "생년월일", "성별", "입원일"];
        for (col, value) in header.iter().enumerate() {
            sheet.write_string(1, col as u16, *value).unwrap();
        }
        sheet.write_string(2, 0, "  ").unwrap();
        sheet.write_string(3, 6, "출력일 2024-05-01").unwrap();
        workbook.save(&path).unwrap();
        std::fs::write(marker_path(&path), b"").unwrap();

        let outcome = f.coordinator.process_file(&InpatientHandler, &path).await.unwrap();

        let FileOutcome::Imported { status, stats, .. } = outcome else {
            panic!("expected import, got {outcome:?}");
        };
        assert_eq!(status, ImportStatus::Success);
        assert_eq!(stats.total_rows, 0);

        let imports = f.store.imports().unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].status, ImportStatus::Success);
        assert_eq!(
            imports[0].stats_json,
            Some(serde_json::json!({"total": 0, "message": "no data rows"}))
        );
        assert!(f.store.snapshot().unwrap().import_errors.is_empty());
        assert_eq!(f.dir_names("archive").len(), 1);
        assert!(f.dir_names("error").is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_run_folder_processes_in_name_order() {
        let f = Fixture::new().await;
        f.drop_inpatient("b.xlsx", &[["P2", "Lee", "1970-02-02", "F", "2024-01-01"]]);
        f.drop_inpatient("a.xlsx", &[KIM]);
        std::fs::write(f.config.folders.inpatient.join("notes.txt"), b"ignored").unwrap();

        let summary = f
            .coordinator
            .run_folder(&InpatientHandler, &f.config.folders.inpatient)
            .await;

        assert_eq!(summary.files_seen, 2);
        assert_eq!(summary.imported, 2);
        let imports = f.store.imports().unwrap();
        assert!(imports[0].file_path.ends_with("a.xlsx"));
        assert!(imports[1].file_path.ends_with("b.xlsx"));
    }

    #[tokio::test]
    async fn test_missing_folder_yields_empty_summary() {
        let f = Fixture::new().await;
        let summary = f
            .coordinator
            .run_folder(&InpatientHandler, &f.root.path().join("nowhere"))
            .await;
        assert_eq!(summary.files_seen, 0);
    }
}
