//! Report discovery under a root directory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use labdata_ingest::FileType;

/// Every report file below `root`, in a stable (name-sorted) order.
///
/// Unreadable entries are logged and skipped.
pub fn find_reports(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    let mut reports = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && FileType::from_path(entry.path()).is_report() {
                    reports.push(entry.into_path());
                }
            }
            Err(e) => warn!("Error accessing entry: {}", e),
        }
    }

    debug!("{} report files under {}", reports.len(), root.display());
    Ok(reports)
}
