//! Receipt detection
//!
//! Decides whether a dropped file has been completely written. The probe
//! never fails: anything that cannot be inspected is simply "not ready" and
//! will be looked at again on the next run.

use crate::config::ReceiptConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Receipt policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
    /// Ready once `<file>.done` exists next to the file
    DoneSignal,
    /// Ready when the size is nonzero and unchanged across the wait window
    StableSize(Duration),
    /// Ready when the file exists and is nonzero (`eof_marker` and unknown modes)
    Presence,
}

impl ReceiptMode {
    pub fn from_config(config: &ReceiptConfig) -> Self {
        match config.mode.trim() {
            "done_signal" => ReceiptMode::DoneSignal,
            "stable_size" => {
                ReceiptMode::StableSize(Duration::from_secs(config.stable_wait_seconds))
            }
            "eof_marker" => ReceiptMode::Presence,
            other => {
                tracing::warn!(
                    mode = other,
                    "Unknown receipt mode, falling back to presence check"
                );
                ReceiptMode::Presence
            }
        }
    }
}

/// Path of the receipt marker for `path`
pub fn marker_path(path: &Path) -> PathBuf {
    let mut marker = path.as_os_str().to_owned();
    marker.push(".done");
    PathBuf::from(marker)
}

/// Probes files for completeness
#[derive(Debug, Clone)]
pub struct ReceiptDetector {
    mode: ReceiptMode,
}

impl ReceiptDetector {
    pub fn new(mode: ReceiptMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ReceiptMode {
        self.mode
    }

    /// Returns true when the file can be read safely
    ///
    /// With [`ReceiptMode::StableSize`] this waits for the configured window
    /// before answering.
    pub async fn is_ready(&self, path: &Path) -> bool {
        match self.mode {
            ReceiptMode::DoneSignal => tokio::fs::metadata(marker_path(path)).await.is_ok(),
            ReceiptMode::StableSize(wait) => {
                let Some(before) = file_size(path).await else {
                    return false;
                };
                tokio::time::sleep(wait).await;
                let Some(after) = file_size(path).await else {
                    return false;
                };
                before == after && after > 0
            }
            ReceiptMode::Presence => file_size(path).await.is_some_and(|size| size > 0),
        }
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}
