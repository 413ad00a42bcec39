//! Append-only scan history.
//!
//! One JSON document per line, oldest first. Appending never rewrites
//! earlier entries, so a torn write can only damage the last line.

use crate::core::error::{Error, Result};
use crate::core::types::ScanReport;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Scan history log.
pub struct ScanHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ScanHistory {
    /// Use the history file at `path` (created on first append).
    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a completed report.
    pub fn append(&self, report: &ScanReport) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Io("scan history lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::directory_access(parent, e))?;
        }

        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::file_write(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| Error::file_write(&self.path, e))?;
        file.sync_data()
            .map_err(|e| Error::file_write(&self.path, e))?;

        Ok(())
    }

    /// Load every readable report, oldest first.
    pub fn load(&self) -> Result<Vec<ScanReport>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents =
            fs::read_to_string(&self.path).map_err(|e| Error::file_read(&self.path, e))?;

        let mut reports = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ScanReport>(line) {
                Ok(report) => reports.push(report),
                Err(e) => log::warn!(
                    "Skipping unreadable scan history entry {} in {:?}: {}",
                    index + 1,
                    self.path,
                    e
                ),
            }
        }

        Ok(reports)
    }

    /// The most recent report, if any.
    pub fn last(&self) -> Result<Option<ScanReport>> {
        Ok(self.load()?.pop())
    }
}
