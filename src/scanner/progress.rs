//! Scan progress tracking and reporting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Scan progress information.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files processed so far
    pub files_processed: u64,
    /// Files counted before the inspection pass (best-effort estimate)
    pub files_total: u64,
    /// Number of threats found
    pub threats_found: u64,
    /// Path most recently processed
    pub current_path: Option<PathBuf>,
    /// Scan start time
    pub start_time: Instant,
    /// Whether scan is complete
    pub is_complete: bool,
    /// Whether scan was cancelled
    pub is_cancelled: bool,
}

impl ScanProgress {
    /// Calculate elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Calculate scan rate (files per second).
    pub fn files_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.files_processed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Calculate completion percentage, capped at 100 when the tree grew.
    pub fn percentage(&self) -> f64 {
        if self.files_total == 0 {
            return 100.0;
        }
        ((self.files_processed as f64 / self.files_total as f64) * 100.0).min(100.0)
    }

    /// Status line for the front end.
    pub fn status_text(&self) -> String {
        if self.is_cancelled {
            "Scan cancelled".to_string()
        } else if self.is_complete {
            "Scan completed".to_string()
        } else {
            match &self.current_path {
                Some(path) => format!("Scanning: {}", path.display()),
                None => "Counting files...".to_string(),
            }
        }
    }
}

/// Progress tracker shared between the scan worker and its handle.
#[derive(Debug)]
pub struct ProgressTracker {
    files_processed: AtomicU64,
    files_total: AtomicU64,
    threats_found: AtomicU64,
    current_path: RwLock<Option<PathBuf>>,
    start_time: Instant,
    is_complete: AtomicBool,
    is_cancelled: AtomicBool,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self {
            files_processed: AtomicU64::new(0),
            files_total: AtomicU64::new(0),
            threats_found: AtomicU64::new(0),
            current_path: RwLock::new(None),
            start_time: Instant::now(),
            is_complete: AtomicBool::new(false),
            is_cancelled: AtomicBool::new(false),
        }
    }

    /// Set the number of files found by the counting pass.
    pub fn set_total_files(&self, total: u64) {
        self.files_total.store(total, Ordering::Relaxed);
    }

    /// Record one processed file.
    pub fn file_processed(&self, path: &Path) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut current) = self.current_path.write() {
            *current = Some(path.to_path_buf());
        }
    }

    /// Increment threats found counter.
    pub fn increment_threats(&self) {
        self.threats_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark scan as finished.
    pub fn finish(&self, cancelled: bool) {
        self.is_cancelled.store(cancelled, Ordering::SeqCst);
        self.is_complete.store(!cancelled, Ordering::SeqCst);
    }

    /// Get current progress snapshot.
    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_total: self.files_total.load(Ordering::Relaxed),
            threats_found: self.threats_found.load(Ordering::Relaxed),
            current_path: self.current_path.read().ok().and_then(|p| p.clone()),
            start_time: self.start_time,
            is_complete: self.is_complete.load(Ordering::SeqCst),
            is_cancelled: self.is_cancelled.load(Ordering::SeqCst),
        }
    }
}

/// Console progress reporter.
pub struct ConsoleProgressReporter {
    last_line_length: std::sync::atomic::AtomicUsize,
}

impl Default for ConsoleProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleProgressReporter {
    /// Create a new console reporter.
    pub fn new() -> Self {
        Self {
            last_line_length: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Report progress to console.
    pub fn report(&self, progress: &ScanProgress) {
        let message = format!(
            "\r[{:.1}%] {}/{} files | Threats: {} | Rate: {:.0}/s",
            progress.percentage(),
            progress.files_processed,
            progress.files_total,
            progress.threats_found,
            progress.files_per_second(),
        );

        let last_len = self.last_line_length.load(Ordering::Relaxed);
        let padding = if message.len() < last_len {
            " ".repeat(last_len - message.len())
        } else {
            String::new()
        };

        eprint!("{}{}", message, padding);
        self.last_line_length.store(message.len(), Ordering::Relaxed);

        if progress.is_complete || progress.is_cancelled {
            eprintln!();
        }
    }

    /// Report a detection on its own line.
    pub fn report_threat(&self, path: &Path, description: &str) {
        eprintln!("\n  [!] {} - {}", path.display(), description);
        self.last_line_length.store(0, Ordering::Relaxed);
    }
}
