//! File destination for the duplicate report.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, SyncError};
use crate::store::ReportSink;

use super::LedgerReport;

/// Writes the report to a fixed path, replacing any previous run's report.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    path: PathBuf,
}

impl FileReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileReportSink {
    fn publish(&self, report: &LedgerReport) -> Result<()> {
        let path = self.path.as_path();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
            }
        }

        fs::write(path, &report.body).map_err(|e| SyncError::io(path, e))?;
        info!(path = %path.display(), duplicates = report.count, "{}", report.summary());
        Ok(())
    }
}
