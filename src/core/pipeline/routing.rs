//! File routing
//!
//! Processed files go to the archive folder under a timestamped name and
//! their receipt marker is deleted. Rejected files go to the error folder
//! unmodified, together with their marker, so an operator can fix and
//! re-drop both.

use crate::config::FoldersConfig;
use crate::core::receipt::marker_path;
use crate::domain::{IntakeError, Result};
use chrono::NaiveDateTime;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix format appended to archived file names
pub const ARCHIVE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Moves files out of the watched folders
#[derive(Debug, Clone)]
pub struct FileRouter {
    archive_dir: PathBuf,
    error_dir: PathBuf,
}

impl FileRouter {
    pub fn new(archive_dir: impl Into<PathBuf>, error_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            error_dir: error_dir.into(),
        }
    }

    pub fn from_config(folders: &FoldersConfig) -> Self {
        Self::new(&folders.archive, &folders.error)
    }

    /// Moves `path` into the archive as `<stem>_<YYYYMMDD_HHMMSS><.ext>` and
    /// deletes its receipt marker
    pub async fn archive(&self, path: &Path, now: NaiveDateTime) -> Result<PathBuf> {
        let name = archive_name(path, now).ok_or_else(|| {
            IntakeError::Io(format!("Cannot archive {}: no file name", path.display()))
        })?;
        let dest = self.archive_dir.join(name);
        move_file(path, &dest).await?;

        let marker = marker_path(path);
        if tokio::fs::try_exists(&marker).await.unwrap_or(false) {
            tokio::fs::remove_file(&marker).await.map_err(|e| {
                IntakeError::Io(format!("Failed to remove marker {}: {e}", marker.display()))
            })?;
        }

        tracing::info!(from = %path.display(), to = %dest.display(), "File archived");
        Ok(dest)
    }

    /// Moves `path` and its receipt marker, unrenamed, into the error folder
    pub async fn quarantine(&self, path: &Path, reason: &str) -> Result<PathBuf> {
        let name = path.file_name().ok_or_else(|| {
            IntakeError::Io(format!("Cannot quarantine {}: no file name", path.display()))
        })?;
        let dest = self.error_dir.join(name);
        move_file(path, &dest).await?;

        let marker = marker_path(path);
        if tokio::fs::try_exists(&marker).await.unwrap_or(false) {
            move_file(&marker, &marker_path(&dest)).await?;
        }

        tracing::error!(
            from = %path.display(),
            to = %dest.display(),
            reason = %reason,
            "File moved to error folder"
        );
        Ok(dest)
    }
}

/// Archive file name for `path` stamped with `now`
pub fn archive_name(path: &Path, now: NaiveDateTime) -> Option<OsString> {
    let stem = path.file_stem()?;
    let mut name = stem.to_owned();
    name.push("_");
    name.push(now.format(ARCHIVE_STAMP_FORMAT).to_string());
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    Some(name)
}

/// Creates every configured folder, the lab folder included
pub async fn ensure_dirs(folders: &FoldersConfig) -> Result<()> {
    for folder in folders.all() {
        tokio::fs::create_dir_all(folder).await.map_err(|e| {
            IntakeError::Io(format!("Failed to create folder {}: {e}", folder.display()))
        })?;
    }
    Ok(())
}

/// Rename, falling back to copy and remove across filesystems
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(from, to).await.map_err(|e| {
        IntakeError::Io(format!(
            "Failed to move {} to {}: {e}",
            from.display(),
            to.display()
        ))
    })?;
    tokio::fs::remove_file(from).await.map_err(|e| {
        IntakeError::Io(format!("Failed to remove {} after copy: {e}", from.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(13, 10, 5)
            .unwrap()
    }

    struct Dirs {
        _root: TempDir,
        inbox: PathBuf,
        router: FileRouter,
        archive: PathBuf,
        error: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = TempDir::new().unwrap();
        let inbox = root.path().join("in");
        let archive = root.path().join("archive");
        let error = root.path().join("error");
        for dir in [&inbox, &archive, &error] {
            std::fs::create_dir_all(dir).unwrap();
        }
        Dirs {
            router: FileRouter::new(&archive, &error),
            _root: root,
            inbox,
            archive,
            error,
        }
    }

    #[test]
    fn test_archive_name_keeps_extension() {
        assert_eq!(
            archive_name(Path::new("/in/census.xlsx"), stamp()).unwrap(),
            OsString::from("census_20240501_131005.xlsx")
        );
        assert_eq!(
            archive_name(Path::new("/in/census"), stamp()).unwrap(),
            OsString::from("census_20240501_131005")
        );
    }

    #[tokio::test]
    async fn test_archive_renames_and_deletes_marker() {
        let d = dirs();
        let file = d.inbox.join("census.xlsx");
        std::fs::write(&file, b"data").unwrap();
        std::fs::write(marker_path(&file), b"").unwrap();

        let dest = d.router.archive(&file, stamp()).await.unwrap();

        assert_eq!(dest, d.archive.join("census_20240501_131005.xlsx"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"data");
        assert!(!file.exists());
        assert!(!marker_path(&file).exists());
        assert!(!marker_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_quarantine_moves_file_and_marker_unmodified() {
        let d = dirs();
        let file = d.inbox.join("census.xlsx");
        std::fs::write(&file, b"broken").unwrap();
        std::fs::write(marker_path(&file), b"").unwrap();

        let dest = d.router.quarantine(&file, "corrupt").await.unwrap();

        assert_eq!(dest, d.error.join("census.xlsx"));
        assert!(marker_path(&dest).exists());
        assert!(!file.exists());
        assert!(!marker_path(&file).exists());
    }

    #[tokio::test]
    async fn test_quarantine_without_marker() {
        let d = dirs();
        let file = d.inbox.join("census.xlsx");
        std::fs::write(&file, b"broken").unwrap();

        let dest = d.router.quarantine(&file, "corrupt").await.unwrap();
        assert!(dest.exists());
        assert!(!marker_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let d = dirs();
        let result = d.router.archive(&d.inbox.join("gone.xlsx"), stamp()).await;
        assert!(matches!(result, Err(IntakeError::Io(_))));
    }

    #[tokio::test]
    async fn test_ensure_dirs_creates_lab_folder() {
        let root = TempDir::new().unwrap();
        let folders = FoldersConfig {
            inpatient: root.path().join("inpatient"),
            outpatient: root.path().join("outpatient"),
            lab: Some(root.path().join("lab")),
            error: root.path().join("error"),
            archive: root.path().join("archive"),
        };
        ensure_dirs(&folders).await.unwrap();
        for folder in folders.all() {
            assert!(folder.is_dir());
        }
    }
}
