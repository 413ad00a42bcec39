//! On-demand scanning.
//!
//! This module provides:
//! - Scan target selection (quick, full, custom)
//! - The threaded file system scanner with cancellation
//! - Progress tracking and reporting
//! - Persistent scan history

pub mod file;
pub mod history;
pub mod progress;
pub mod targets;

pub use file::{CancelToken, FileScanner, ScanEvent, ScanHandle};
pub use history::ScanHistory;
pub use progress::{ConsoleProgressReporter, ProgressTracker, ScanProgress};
pub use targets::{custom_scan_targets, full_scan_targets, quick_scan_targets};
