//! On-demand file system scanner.
//!
//! A scan runs on its own worker thread. It first counts eligible files for
//! progress reporting, then walks the same targets again and inspects files
//! one at a time. Cancellation is checked between files.

use crate::core::error::{Error, Result};
use crate::core::types::{ScanReport, ScanStatus, ScanTarget, ScanType, SkipReason, TraversalMode, Verdict};
use crate::detection::FileInspector;
use crate::scanner::history::ScanHistory;
use crate::scanner::progress::{ProgressTracker, ScanProgress};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Events emitted by a running scan.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Emitted after every processed file
    Progress(ScanProgress),
    /// A file was classified as a threat
    ThreatFound {
        path: PathBuf,
        description: String,
        verdict: Verdict,
    },
    /// Terminal event, also for cancelled scans
    Completed(ScanReport),
}

/// Cooperative cancellation flag shared with the scan worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// File system scanner. Only one scan may run at a time per scanner.
pub struct FileScanner {
    inspector: Arc<FileInspector>,
    history: Arc<ScanHistory>,
    running: Arc<AtomicBool>,
}

impl FileScanner {
    /// Create a scanner that records finished scans in `history`.
    pub fn new(inspector: Arc<FileInspector>, history: Arc<ScanHistory>) -> Self {
        Self {
            inspector,
            history,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether a scan is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a scan on a worker thread.
    ///
    /// Fails with [`Error::ScanAlreadyRunning`] while another scan from this
    /// scanner is still active; the request is not queued.
    pub fn start(&self, targets: Vec<ScanTarget>, scan_type: ScanType) -> Result<ScanHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("Scan request rejected: a scan is already running");
            return Err(Error::ScanAlreadyRunning);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let progress = Arc::new(ProgressTracker::new());

        let job = ScanJob {
            inspector: Arc::clone(&self.inspector),
            history: Arc::clone(&self.history),
            targets,
            scan_type,
            cancel: cancel.clone(),
            progress: Arc::clone(&progress),
            events: tx,
        };

        let worker = std::thread::Builder::new()
            .name("scanner".to_string())
            .spawn(move || {
                let _guard = guard;
                job.run()
            })
            .map_err(|e| Error::WorkerSpawn {
                name: "scanner".to_string(),
                source: e,
            })?;

        Ok(ScanHandle {
            cancel,
            progress,
            events: rx,
            worker,
        })
    }
}

/// Clears the running flag when the worker exits, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running scan.
pub struct ScanHandle {
    cancel: CancelToken,
    progress: Arc<ProgressTracker>,
    events: mpsc::UnboundedReceiver<ScanEvent>,
    worker: JoinHandle<ScanReport>,
}

impl ScanHandle {
    /// Request cancellation. Takes effect before the next file.
    pub fn cancel(&self) {
        log::info!("Scan cancelled by user");
        self.cancel.cancel();
    }

    /// A token that can cancel this scan from elsewhere.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> ScanProgress {
        self.progress.snapshot()
    }

    /// The event stream. Ends after [`ScanEvent::Completed`].
    pub fn events(&mut self) -> &mut mpsc::UnboundedReceiver<ScanEvent> {
        &mut self.events
    }

    /// Block until the worker finishes and return its report.
    pub fn wait(self) -> Result<ScanReport> {
        self.worker
            .join()
            .map_err(|_| Error::WorkerPanicked("scanner".to_string()))
    }
}

struct ScanJob {
    inspector: Arc<FileInspector>,
    history: Arc<ScanHistory>,
    targets: Vec<ScanTarget>,
    scan_type: ScanType,
    cancel: CancelToken,
    progress: Arc<ProgressTracker>,
    events: mpsc::UnboundedSender<ScanEvent>,
}

impl ScanJob {
    fn run(self) -> ScanReport {
        let started_at = Utc::now();
        let timer = Instant::now();
        log::info!("Started {} of {} target(s)", self.scan_type, self.targets.len());

        let total = self.count_files();
        self.progress.set_total_files(total);
        log::debug!("Found {} files to scan", total);

        let mut scanned_files = 0u64;
        let mut skipped_files = 0u64;
        let mut infected_file_paths = Vec::new();

        'targets: for target in &self.targets {
            for path in self.files_in(target, true) {
                if self.cancel.is_cancelled() {
                    break 'targets;
                }

                let verdict = self.inspector.inspect(&path);
                scanned_files += 1;

                match &verdict {
                    Verdict::Clean => {}
                    Verdict::Skipped(SkipReason::Io(msg)) => {
                        log::error!("Error scanning file {}: {}", path.display(), msg);
                        skipped_files += 1;
                    }
                    Verdict::Skipped(reason) => {
                        log::debug!("Skipped {}: {}", path.display(), reason);
                        skipped_files += 1;
                    }
                    Verdict::SignatureMatch(_) | Verdict::HeuristicMatch(_) => {
                        let description = verdict.threat_description().unwrap_or_default();
                        log::warn!("Malware detected: {} ({})", path.display(), description);
                        self.progress.increment_threats();
                        infected_file_paths.push(path.clone());
                        let _ = self.events.send(ScanEvent::ThreatFound {
                            path: path.clone(),
                            description,
                            verdict: verdict.clone(),
                        });
                    }
                }

                self.progress.file_processed(&path);
                let _ = self.events.send(ScanEvent::Progress(self.progress.snapshot()));
            }
        }

        let cancelled = self.cancel.is_cancelled();
        self.progress.finish(cancelled);

        let report = ScanReport {
            scan_id: uuid::Uuid::new_v4().to_string(),
            scan_type: self.scan_type,
            status: if cancelled {
                ScanStatus::Cancelled
            } else {
                ScanStatus::Completed
            },
            started_at,
            finished_at: Utc::now(),
            scanned_files,
            skipped_files,
            infected_files: infected_file_paths.len() as u64,
            infected_file_paths,
            duration_secs: timer.elapsed().as_secs_f64(),
        };

        log::info!(
            "Scan {}: {} files scanned, {} threats found in {:.2}s",
            if cancelled { "cancelled" } else { "completed" },
            report.scanned_files,
            report.infected_files,
            report.duration_secs
        );

        if let Err(e) = self.history.append(&report) {
            log::error!("Error saving scan history: {}", e);
        }

        let _ = self.events.send(ScanEvent::Completed(report.clone()));
        report
    }

    /// First pass: count what the second pass will visit.
    fn count_files(&self) -> u64 {
        let mut total = 0u64;
        for target in &self.targets {
            for _ in self.files_in(target, false) {
                if self.cancel.is_cancelled() {
                    return total;
                }
                total += 1;
            }
        }
        total
    }

    /// Files under a target. Excluded directories are pruned before descent.
    ///
    /// Symlinks to regular files are yielded. Symlinked directories are never
    /// descended.
    fn files_in<'a>(
        &'a self,
        target: &ScanTarget,
        log_errors: bool,
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        match target.mode {
            TraversalMode::SingleFile => Box::new(std::iter::once(target.path.clone())),
            TraversalMode::Recursive => {
                let exclusions = self.inspector.exclusions();
                let walker = WalkDir::new(&target.path)
                    .follow_links(false)
                    .into_iter()
                    .filter_entry(move |e| !(e.file_type().is_dir() && exclusions.is_excluded(e.path())))
                    .filter_map(move |entry| match entry {
                        Ok(e) if e.file_type().is_file() => Some(e.into_path()),
                        Ok(e) if e.path_is_symlink() && e.path().is_file() => Some(e.into_path()),
                        Ok(_) => None,
                        Err(e) => {
                            if log_errors {
                                log::warn!("Error walking directory: {}", e);
                            }
                            None
                        }
                    });
                Box::new(walker)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::types::HashAlgorithm;
    use crate::detection::{ContentSource, FsContentSource, SignatureSet};
    use crate::utils::hash::HashCalculator;
    use std::io;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Blocks every read until the test releases the gate.
    struct GateSource {
        gate: Arc<Mutex<()>>,
    }

    impl ContentSource for GateSource {
        fn size(&self, path: &Path) -> io::Result<u64> {
            FsContentSource.size(path)
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            let _open = self.gate.lock().unwrap();
            std::fs::read(path)
        }
    }

    fn setup(excluded: &[PathBuf], sigs: SignatureSet) -> (TempDir, FileScanner, Arc<ScanHistory>) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.scan.excluded_paths = excluded
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        let inspector = Arc::new(FileInspector::for_scanner(&config, Arc::new(sigs)));
        let history = Arc::new(ScanHistory::open(&dir.path().join("scan_history.jsonl")));
        let scanner = FileScanner::new(inspector, Arc::clone(&history));
        (dir, scanner, history)
    }

    fn gated_scanner(gate: Arc<Mutex<()>>, history_dir: &Path) -> FileScanner {
        let config = Config::default();
        let inspector = FileInspector::for_scanner(&config, Arc::new(SignatureSet::new()))
            .with_source(Arc::new(GateSource { gate }));
        let history = Arc::new(ScanHistory::open(&history_dir.join("scan_history.jsonl")));
        FileScanner::new(Arc::new(inspector), history)
    }

    fn drain(handle: &mut ScanHandle) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.events().blocking_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_scan_reports_signature_match() {
        let targets = TempDir::new().unwrap();
        let evil = targets.path().join("evil.bin");
        std::fs::write(&evil, b"definitely malware").unwrap();
        std::fs::write(targets.path().join("a.txt"), b"alpha").unwrap();
        std::fs::write(targets.path().join("b.txt"), b"bravo").unwrap();

        let mut sigs = SignatureSet::new();
        sigs.insert(
            HashAlgorithm::Sha256,
            &HashCalculator::sha256_bytes(b"definitely malware"),
        );
        let (_dir, scanner, history) = setup(&[], sigs);

        let mut handle = scanner
            .start(vec![ScanTarget::directory(targets.path())], ScanType::Custom)
            .unwrap();
        let events = drain(&mut handle);
        let report = handle.wait().unwrap();

        assert_eq!(report.status, ScanStatus::Completed);
        assert_eq!(report.scanned_files, 3);
        assert_eq!(report.infected_files, 1);
        assert_eq!(report.infected_file_paths, vec![evil.clone()]);

        let progress: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Progress(p) => Some(p.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 3);
        assert!(progress.iter().all(|p| p.files_total == 3));
        assert_eq!(progress.last().unwrap().files_processed, 3);

        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::ThreatFound { path, .. } if *path == evil
        )));
        assert!(matches!(events.last(), Some(ScanEvent::Completed(_))));

        assert_eq!(history.last().unwrap().unwrap(), report);
        assert!(!scanner.is_running());
    }

    #[test]
    fn test_excluded_directory_not_visited() {
        let targets = TempDir::new().unwrap();
        let excluded = targets.path().join("vendor");
        std::fs::create_dir_all(excluded.join("nested")).unwrap();
        std::fs::write(excluded.join("nested").join("tool.exe"), b"cmd.exe /c calc").unwrap();
        std::fs::write(targets.path().join("app.exe"), b"MZ clean").unwrap();

        let (_dir, scanner, _history) = setup(&[excluded], SignatureSet::new());
        let handle = scanner
            .start(vec![ScanTarget::directory(targets.path())], ScanType::Custom)
            .unwrap();
        let report = handle.wait().unwrap();

        assert_eq!(report.scanned_files, 1);
        assert_eq!(report.infected_files, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_inspected() {
        let targets = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let payload = outside.path().join("payload.bin");
        std::fs::write(&payload, b"definitely malware").unwrap();
        std::fs::create_dir(outside.path().join("nested")).unwrap();
        std::fs::write(outside.path().join("nested").join("other.bin"), b"definitely malware").unwrap();

        let link = targets.path().join("innocent.bin");
        std::os::unix::fs::symlink(&payload, &link).unwrap();
        std::os::unix::fs::symlink(outside.path().join("nested"), targets.path().join("dirlink"))
            .unwrap();

        let mut sigs = SignatureSet::new();
        sigs.insert(
            HashAlgorithm::Sha256,
            &HashCalculator::sha256_bytes(b"definitely malware"),
        );
        let (_dir, scanner, _history) = setup(&[], sigs);
        let handle = scanner
            .start(vec![ScanTarget::directory(targets.path())], ScanType::Custom)
            .unwrap();
        let report = handle.wait().unwrap();

        assert_eq!(report.scanned_files, 1);
        assert_eq!(report.infected_file_paths, vec![link]);
    }

    #[test]
    fn test_single_file_target_with_heuristic() {
        let targets = TempDir::new().unwrap();
        let script = targets.path().join("install.bat");
        std::fs::write(&script, b"@echo off\r\nnet user /add backdoor").unwrap();

        let (_dir, scanner, _history) = setup(&[], SignatureSet::new());
        let handle = scanner
            .start(vec![ScanTarget::file(&script)], ScanType::Custom)
            .unwrap();
        let report = handle.wait().unwrap();

        assert_eq!(report.scanned_files, 1);
        assert_eq!(report.infected_file_paths, vec![script]);
    }

    #[test]
    fn test_missing_file_counts_as_skipped() {
        let targets = TempDir::new().unwrap();
        let (_dir, scanner, _history) = setup(&[], SignatureSet::new());
        let handle = scanner
            .start(
                vec![ScanTarget::file(targets.path().join("vanished.exe"))],
                ScanType::Custom,
            )
            .unwrap();
        let report = handle.wait().unwrap();

        assert_eq!(report.scanned_files, 1);
        assert_eq!(report.skipped_files, 1);
        assert_eq!(report.status, ScanStatus::Completed);
    }

    #[test]
    fn test_second_scan_rejected_while_running() {
        let targets = TempDir::new().unwrap();
        std::fs::write(targets.path().join("one.exe"), b"1").unwrap();
        let history_dir = TempDir::new().unwrap();

        let gate = Arc::new(Mutex::new(()));
        let scanner = gated_scanner(Arc::clone(&gate), history_dir.path());

        let held = gate.lock().unwrap();
        let handle = scanner
            .start(vec![ScanTarget::directory(targets.path())], ScanType::Custom)
            .unwrap();
        assert!(scanner.is_running());
        assert!(matches!(
            scanner.start(vec![ScanTarget::directory(targets.path())], ScanType::Quick),
            Err(Error::ScanAlreadyRunning)
        ));
        drop(held);

        let report = handle.wait().unwrap();
        assert_eq!(report.scanned_files, 1);
        assert!(!scanner.is_running());

        // A new scan is accepted once the first one is done
        let handle = scanner
            .start(vec![ScanTarget::directory(targets.path())], ScanType::Custom)
            .unwrap();
        handle.wait().unwrap();
    }

    #[test]
    fn test_cancel_emits_incomplete_report() {
        let targets = TempDir::new().unwrap();
        for name in ["a.exe", "b.exe", "c.exe"] {
            std::fs::write(targets.path().join(name), name.as_bytes()).unwrap();
        }
        let history_dir = TempDir::new().unwrap();

        let gate = Arc::new(Mutex::new(()));
        let scanner = gated_scanner(Arc::clone(&gate), history_dir.path());

        let held = gate.lock().unwrap();
        let mut handle = scanner
            .start(vec![ScanTarget::directory(targets.path())], ScanType::Custom)
            .unwrap();
        handle.cancel();
        drop(held);

        let events = drain(&mut handle);
        let report = handle.wait().unwrap();

        assert_eq!(report.status, ScanStatus::Cancelled);
        assert!(report.is_incomplete());
        assert!(report.scanned_files <= 1);
        assert!(matches!(events.last(), Some(ScanEvent::Completed(r)) if r.is_incomplete()));

        let history = ScanHistory::open(&history_dir.path().join("scan_history.jsonl"));
        assert_eq!(history.load().unwrap().len(), 1);
    }
}
