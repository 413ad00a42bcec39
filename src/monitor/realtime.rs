//! Real-time protection.
//!
//! A worker thread sweeps a fixed set of directories on an interval, looking
//! only at direct children with a watched extension. Each path is inspected at
//! most once per cool-down window. The cool-down is keyed by path only, so a
//! file replaced in place is not re-inspected until its window expires.

use crate::core::config::MonitorConfig;
use crate::core::error::{Error, Result};
use crate::core::types::{SkipReason, Verdict};
use crate::detection::heuristic::extension_allowed;
use crate::detection::FileInspector;
use crate::monitor::watch_state::WatchState;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Granularity of the stop check while sleeping between sweeps.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Time source for cool-down decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A threat found by real-time protection.
#[derive(Debug, Clone)]
pub struct ThreatEvent {
    pub path: PathBuf,
    pub description: String,
    pub verdict: Verdict,
    pub detected_at: DateTime<Utc>,
}

/// Downloads, Desktop and the temp directory.
pub fn default_watched_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    dirs.extend(dirs::download_dir());
    dirs.extend(dirs::desktop_dir());
    dirs.push(std::env::temp_dir());
    dirs.dedup();
    dirs
}

/// One pass over the watched directories. Owns the cool-down state.
struct Sweeper {
    inspector: Arc<FileInspector>,
    watched_dirs: Vec<PathBuf>,
    watched_extensions: Vec<String>,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    state: WatchState,
    events: mpsc::UnboundedSender<ThreatEvent>,
}

impl Sweeper {
    /// Sweep every watched directory once. Returns the number of files inspected.
    fn sweep(&mut self, stop: &AtomicBool) -> usize {
        let mut inspected = 0;
        for index in 0..self.watched_dirs.len() {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            let dir = self.watched_dirs[index].clone();
            match self.sweep_dir(&dir) {
                Ok(count) => inspected += count,
                Err(e) => log::error!("Real-time protection error in {}: {}", dir.display(), e),
            }
        }
        inspected
    }

    fn sweep_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() || self.inspector.exclusions().is_excluded(dir) {
            return Ok(0);
        }

        let entries = std::fs::read_dir(dir).map_err(|e| Error::directory_access(dir, e))?;
        let mut inspected = 0;

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    log::warn!("Error reading entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            if !path.is_file() || !extension_allowed(&path, &self.watched_extensions) {
                continue;
            }
            if self.inspector.exclusions().is_excluded(&path) {
                continue;
            }

            let now = self.clock.now();
            if !self.state.should_inspect(&path, now, self.cooldown) {
                continue;
            }
            self.state.record(&path, now);

            inspected += 1;
            self.handle_verdict(&path, self.inspector.inspect(&path));
        }

        Ok(inspected)
    }

    fn handle_verdict(&self, path: &Path, verdict: Verdict) {
        match verdict {
            Verdict::SignatureMatch(_) | Verdict::HeuristicMatch(_) => {
                let description = verdict.threat_description().unwrap_or_default();
                log::warn!(
                    "Real-time protection detected threat: {} ({})",
                    path.display(),
                    description
                );
                let event = ThreatEvent {
                    path: path.to_path_buf(),
                    description,
                    verdict,
                    detected_at: Utc::now(),
                };
                if self.events.send(event).is_err() {
                    log::debug!("Threat event dropped: no listener");
                }
            }
            Verdict::Skipped(SkipReason::Io(msg)) => {
                log::warn!("Real-time protection could not read {}: {}", path.display(), msg);
            }
            Verdict::Skipped(_) | Verdict::Clean => {}
        }
    }
}

/// Real-time protection service. Either stopped or running; no pause.
pub struct RealTimeMonitor {
    inspector: Arc<FileInspector>,
    watched_dirs: Vec<PathBuf>,
    watched_extensions: Vec<String>,
    poll_interval: Duration,
    cooldown: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RealTimeMonitor {
    /// Create a stopped monitor over the default watched directories.
    pub fn new(config: &MonitorConfig, inspector: Arc<FileInspector>) -> Self {
        Self {
            inspector,
            watched_dirs: default_watched_dirs(),
            watched_extensions: config.watched_extensions.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            cooldown: Duration::from_secs(config.cooldown_secs),
            capacity: config.watch_state_capacity,
            clock: Arc::new(SystemClock),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Watch these directories instead of the defaults.
    pub fn with_watched_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.watched_dirs = dirs;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched_dirs
    }

    /// Whether the worker is alive.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Start the sweep loop. Threat events arrive on the returned channel.
    pub fn start(&mut self) -> Result<mpsc::UnboundedReceiver<ThreatEvent>> {
        if self.is_running() {
            return Err(Error::MonitorAlreadyRunning);
        }
        // Reap a worker that exited on its own
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.stop.store(false, Ordering::SeqCst);

        let mut sweeper = Sweeper {
            inspector: Arc::clone(&self.inspector),
            watched_dirs: self.watched_dirs.clone(),
            watched_extensions: self.watched_extensions.clone(),
            cooldown: self.cooldown,
            clock: Arc::clone(&self.clock),
            state: WatchState::new(self.capacity),
            events: tx,
        };
        let stop = Arc::clone(&self.stop);
        let interval = self.poll_interval;

        let worker = std::thread::Builder::new()
            .name("realtime-monitor".to_string())
            .spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    sweeper.sweep(&stop);
                    sleep_unless_stopped(&stop, interval);
                }
            })
            .map_err(|e| Error::WorkerSpawn {
                name: "realtime-monitor".to_string(),
                source: e,
            })?;

        self.worker = Some(worker);
        log::info!(
            "Real-time protection started ({} directories, every {}s)",
            self.watched_dirs.len(),
            self.poll_interval.as_secs_f64()
        );
        Ok(rx)
    }

    /// Stop the loop and wait for the current directory to finish.
    pub fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.stop.store(true, Ordering::SeqCst);
        worker
            .join()
            .map_err(|_| Error::WorkerPanicked("realtime-monitor".to_string()))?;
        log::info!("Real-time protection stopped");
        Ok(())
    }
}

impl Drop for RealTimeMonitor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Error stopping real-time protection: {}", e);
        }
    }
}

fn sleep_unless_stopped(stop: &AtomicBool, interval: Duration) {
    let deadline = Instant::now() + interval;
    while !stop.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        std::thread::sleep(remaining.min(STOP_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::detection::SignatureSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct ManualClock(Mutex<Instant>);

    impl ManualClock {
        fn new() -> Self {
            Self(Mutex::new(Instant::now()))
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    fn sweeper(
        dirs: Vec<PathBuf>,
        excluded: &[PathBuf],
        clock: Arc<dyn Clock>,
    ) -> (Sweeper, mpsc::UnboundedReceiver<ThreatEvent>) {
        let mut config = Config::default();
        config.scan.excluded_paths = excluded
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        let inspector = FileInspector::for_monitor(&config, Arc::new(SignatureSet::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        let sweeper = Sweeper {
            inspector: Arc::new(inspector),
            watched_dirs: dirs,
            watched_extensions: config.monitor.watched_extensions.clone(),
            cooldown: Duration::from_secs(config.monitor.cooldown_secs),
            clock,
            state: WatchState::new(config.monitor.watch_state_capacity),
            events: tx,
        };
        (sweeper, rx)
    }

    #[test]
    fn test_cooldown_with_manual_clock() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("setup.exe"), b"MZ clean").unwrap();

        let clock = Arc::new(ManualClock::new());
        let (mut sweeper, _rx) = sweeper(vec![dir.path().to_path_buf()], &[], clock.clone());
        let stop = AtomicBool::new(false);

        assert_eq!(sweeper.sweep(&stop), 1);
        assert_eq!(sweeper.sweep(&stop), 0);

        clock.advance(Duration::from_secs(299));
        assert_eq!(sweeper.sweep(&stop), 0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(sweeper.sweep(&stop), 1);
    }

    #[test]
    fn test_threat_event_emitted() {
        let dir = TempDir::new().unwrap();
        let evil = dir.path().join("run.ps1");
        std::fs::write(&evil, b"powershell -e SQBFAFgA").unwrap();

        let (mut sweeper, mut rx) =
            sweeper(vec![dir.path().to_path_buf()], &[], Arc::new(SystemClock));
        sweeper.sweep(&AtomicBool::new(false));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.path, evil);
        assert!(event.verdict.is_threat());
        assert!(event.description.starts_with("Suspicious behavior detected"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unwatched_extension_and_subdirs_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"cmd.exe /c").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep.exe"), b"cmd.exe /c").unwrap();

        let (mut sweeper, _rx) =
            sweeper(vec![dir.path().to_path_buf()], &[], Arc::new(SystemClock));
        assert_eq!(sweeper.sweep(&AtomicBool::new(false)), 0);
    }

    #[test]
    fn test_missing_and_excluded_dirs_skipped() {
        let dir = TempDir::new().unwrap();
        let excluded = dir.path().join("excluded");
        std::fs::create_dir(&excluded).unwrap();
        std::fs::write(excluded.join("tool.exe"), b"cmd.exe /c").unwrap();

        let (mut sweeper, mut rx) = sweeper(
            vec![dir.path().join("missing"), excluded.clone()],
            &[excluded],
            Arc::new(SystemClock),
        );
        assert_eq!(sweeper.sweep(&AtomicBool::new(false)), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_flag_checked_per_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.exe"), b"MZ").unwrap();

        let (mut sweeper, _rx) =
            sweeper(vec![dir.path().to_path_buf()], &[], Arc::new(SystemClock));
        assert_eq!(sweeper.sweep(&AtomicBool::new(true)), 0);
    }

    #[test]
    fn test_start_and_stop() {
        let dir = TempDir::new().unwrap();
        let evil = dir.path().join("dropper.bat");
        std::fs::write(&evil, b"net user /add intruder").unwrap();

        let config = Config::default();
        let inspector = Arc::new(FileInspector::for_monitor(
            &config,
            Arc::new(SignatureSet::new()),
        ));
        let mut monitor = RealTimeMonitor::new(&config.monitor, inspector)
            .with_watched_dirs(vec![dir.path().to_path_buf()])
            .with_poll_interval(Duration::from_millis(50));

        let mut rx = monitor.start().unwrap();
        assert!(monitor.is_running());
        assert!(matches!(monitor.start(), Err(Error::MonitorAlreadyRunning)));

        let deadline = Instant::now() + Duration::from_secs(10);
        let event = loop {
            match rx.try_recv() {
                Ok(event) => break event,
                Err(_) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(20)),
                Err(e) => panic!("no threat event: {:?}", e),
            }
        };
        assert_eq!(event.path, evil);

        monitor.stop().unwrap();
        assert!(!monitor.is_running());

        // Restartable after stop
        let _rx = monitor.start().unwrap();
        monitor.stop().unwrap();
    }
}
