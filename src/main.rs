//! ArcSentinel: endpoint malware detection and quarantine.
//!
//! This is the main entry point for the CLI application.

use arc_sentinel::core::config::Config;
use arc_sentinel::core::error::{Error, Result};
use arc_sentinel::core::types::{HashAlgorithm, ScanReport, ScanType};
use arc_sentinel::detection::{FileInspector, SignatureSet};
use arc_sentinel::monitor::RealTimeMonitor;
use arc_sentinel::quarantine::{QuarantineManager, QuarantineOutcome};
use arc_sentinel::scanner::{
    custom_scan_targets, full_scan_targets, quick_scan_targets, ConsoleProgressReporter,
    FileScanner, ScanEvent, ScanHistory,
};
use arc_sentinel::ui::cli::{
    Cli, Commands, ConfigAction, OutputFormat, QuarantineAction, SignatureAction,
};
use arc_sentinel::utils::logging::{init_logging, ActivityLog, LogConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum time between console progress updates.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let config = load_config(cli.config.as_deref())?;
    config.validate()?;

    let mut log_config = LogConfig::from_config(&config);
    if cli.verbose {
        log_config = log_config.verbose();
    }
    init_logging(log_config)?;

    log::debug!("ArcSentinel v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Configuration loaded from {}", config_path.display());

    match cli.command {
        Some(Commands::Scan {
            quick: _,
            full,
            path,
            quarantine,
        }) => run_scan(&config, full, path, quarantine, cli.format).await,
        Some(Commands::Monitor { quarantine }) => {
            run_monitor(&config, quarantine, cli.format).await
        }
        Some(Commands::Quarantine { action }) => run_quarantine(action, &config, cli.format),
        Some(Commands::History { limit }) => run_history(&config, limit, cli.format),
        Some(Commands::Signatures { action }) => run_signatures(action, &config, cli.format),
        Some(Commands::Config { action }) => run_config(action, &config_path, config),
        Some(Commands::Logs { lines }) => run_logs(&config, lines),
        None => {
            println!("ArcSentinel - Malware Detection and Quarantine");
            println!();
            println!("Use --help for usage information");
            println!();
            println!("Quick start:");
            println!("  arc-sentinel scan --quick       Run a quick scan");
            println!("  arc-sentinel scan --path <dir>  Scan a folder");
            println!("  arc-sentinel monitor            Start real-time protection");
            println!("  arc-sentinel quarantine list    View quarantined items");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if path.exists() => Config::load(path),
        Some(_) => Ok(Config::default()),
        None => Ok(Config::load_or_default()),
    }
}

fn load_signatures(config: &Config) -> Result<Arc<SignatureSet>> {
    let signatures = SignatureSet::load_or_create(&config.storage.signatures_file())?;
    log::info!("Loaded {} signatures", signatures.len());
    Ok(Arc::new(signatures))
}

/// Run a malware scan.
async fn run_scan(
    config: &Config,
    full: bool,
    path: Option<Vec<PathBuf>>,
    quarantine: bool,
    format: OutputFormat,
) -> Result<()> {
    let (targets, scan_type) = if full {
        (full_scan_targets(), ScanType::Full)
    } else if let Some(paths) = path {
        (custom_scan_targets(&paths)?, ScanType::Custom)
    } else {
        (quick_scan_targets(), ScanType::Quick)
    };
    if targets.is_empty() {
        log::warn!("No scan targets found");
    }

    let inspector = Arc::new(FileInspector::for_scanner(config, load_signatures(config)?));
    let history = Arc::new(ScanHistory::open(&config.storage.history_file()));
    let scanner = FileScanner::new(inspector, history);

    let mut handle = scanner.start(targets, scan_type)?;
    let cancel = handle.cancel_token();
    let reporter = ConsoleProgressReporter::new();
    let interactive = format == OutputFormat::Text;
    let mut last_report = Instant::now();

    loop {
        tokio::select! {
            event = handle.events().recv() => match event {
                Some(ScanEvent::Progress(progress)) => {
                    if interactive && last_report.elapsed() >= PROGRESS_INTERVAL {
                        reporter.report(&progress);
                        last_report = Instant::now();
                    }
                }
                Some(ScanEvent::ThreatFound { path, description, .. }) => {
                    if interactive {
                        reporter.report_threat(&path, &description);
                    }
                }
                Some(ScanEvent::Completed(_)) | None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                if interactive {
                    eprintln!("\nCancelling scan...");
                }
                cancel.cancel();
            }
        }
    }

    let report = tokio::task::spawn_blocking(move || handle.wait())
        .await
        .map_err(|e| Error::WorkerPanicked(e.to_string()))??;

    let outcomes = if quarantine {
        contain_all(config, &report.infected_file_paths)?
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "report": report,
                "quarantine": outcomes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            print_report(&report);
            for (path, outcome) in report.infected_file_paths.iter().zip(&outcomes) {
                println!("  {} - {}", path.display(), outcome.message);
            }
        }
    }

    Ok(())
}

fn print_report(report: &ScanReport) {
    println!();
    println!("=== Scan Complete ===");
    println!("Scan ID:         {}", report.scan_id);
    println!("Scan Type:       {}", report.scan_type);
    println!("Status:          {:?}", report.status);
    println!("Finished:        {}", report.timestamp());
    println!("Files Scanned:   {}", report.scanned_files);
    println!("Files Skipped:   {}", report.skipped_files);
    println!("Threats Found:   {}", report.infected_files);
    println!("Duration:        {:.2} seconds", report.duration_secs);

    if !report.infected_file_paths.is_empty() {
        println!();
        println!("Infected files:");
        for path in &report.infected_file_paths {
            println!("  {}", path.display());
        }
    }
}

fn contain_all(config: &Config, paths: &[PathBuf]) -> Result<Vec<QuarantineOutcome>> {
    let manager = QuarantineManager::open(&config.storage.quarantine_dir())?;
    Ok(paths
        .iter()
        .map(|path| QuarantineOutcome::contained(&manager.contain(path)))
        .collect())
}

/// Run real-time protection until Ctrl-C.
async fn run_monitor(config: &Config, quarantine: bool, format: OutputFormat) -> Result<()> {
    if !config.monitor.real_time_protection {
        log::warn!("Real-time protection is disabled in settings; running on request");
    }

    let inspector = Arc::new(FileInspector::for_monitor(config, load_signatures(config)?));
    let manager = if quarantine {
        Some(QuarantineManager::open(&config.storage.quarantine_dir())?)
    } else {
        None
    };

    let mut monitor = RealTimeMonitor::new(&config.monitor, inspector);
    let mut threats = monitor.start()?;

    if format == OutputFormat::Text {
        println!("Real-time protection running. Watching:");
        for dir in monitor.watched_dirs() {
            println!("  {}", dir.display());
        }
        println!("Press Ctrl-C to stop.");
    }

    loop {
        tokio::select! {
            event = threats.recv() => {
                let Some(event) = event else { break };
                let outcome = manager
                    .as_ref()
                    .map(|m| QuarantineOutcome::contained(&m.contain(&event.path)));

                match format {
                    OutputFormat::Json => {
                        let output = serde_json::json!({
                            "path": event.path,
                            "description": event.description,
                            "verdict": event.verdict,
                            "detected_at": event.detected_at,
                            "quarantine": outcome,
                        });
                        println!("{}", serde_json::to_string(&output)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "[{}] Threat detected: {} in {}",
                            event.detected_at.with_timezone(&chrono::Local).format("%H:%M:%S"),
                            event.description,
                            event.path.display()
                        );
                        if let Some(outcome) = outcome {
                            println!("  {}", outcome.message);
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tokio::task::spawn_blocking(move || monitor.stop())
        .await
        .map_err(|e| Error::WorkerPanicked(e.to_string()))?
}

/// Manage quarantine.
fn run_quarantine(action: QuarantineAction, config: &Config, format: OutputFormat) -> Result<()> {
    let manager = QuarantineManager::open(&config.storage.quarantine_dir())?;

    let (outcome, result) = match action {
        QuarantineAction::List => {
            let records = manager.list()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                OutputFormat::Text if records.is_empty() => println!("Quarantine is empty."),
                OutputFormat::Text => {
                    for record in &records {
                        println!(
                            "{} (Quarantined on {})",
                            record.original_path.display(),
                            record.quarantine_date
                        );
                        println!("  {}", record.artifact_name());
                    }
                }
            }
            return Ok(());
        }
        QuarantineAction::Orphans { remove } => {
            let orphans = manager.orphaned_metadata()?;
            let removed = if remove { manager.remove_orphans()? } else { 0 };
            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({ "orphans": orphans, "removed": removed });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    for orphan in &orphans {
                        println!("{}", orphan.display());
                    }
                    println!("{} orphaned metadata file(s), {} removed", orphans.len(), removed);
                }
            }
            return Ok(());
        }
        QuarantineAction::Add { path } => {
            let result = manager.contain(&path);
            (QuarantineOutcome::contained(&result), result.map(|_| ()))
        }
        QuarantineAction::Restore { item } => {
            let result = manager.restore(&item);
            (QuarantineOutcome::restored(&result), result.map(|_| ()))
        }
        QuarantineAction::Purge { item } => {
            let result = manager.purge(&item);
            (QuarantineOutcome::purged(&result), result)
        }
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            println!("{}", outcome.message);
            if let Some(path) = &outcome.quarantine_path {
                println!("  {}", path.display());
            }
        }
    }

    result
}

/// Show recent scans, newest first.
fn run_history(config: &Config, limit: usize, format: OutputFormat) -> Result<()> {
    let history = ScanHistory::open(&config.storage.history_file());
    let reports: Vec<ScanReport> = history.load()?.into_iter().rev().take(limit).collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text if reports.is_empty() => println!("No scans recorded."),
        OutputFormat::Text => {
            println!(
                "{:<20} {:<12} {:<10} {:>8} {:>8} {:>10}",
                "Finished", "Type", "Status", "Files", "Threats", "Duration"
            );
            for report in &reports {
                println!(
                    "{:<20} {:<12} {:<10} {:>8} {:>8} {:>9.1}s",
                    report.timestamp(),
                    report.scan_type.to_string(),
                    format!("{:?}", report.status),
                    report.scanned_files,
                    report.infected_files,
                    report.duration_secs
                );
            }
        }
    }
    Ok(())
}

/// Manage the signature set.
fn run_signatures(action: SignatureAction, config: &Config, format: OutputFormat) -> Result<()> {
    let path = config.storage.signatures_file();

    match action {
        SignatureAction::Info => {
            let set = SignatureSet::load_or_create(&path)?;
            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "path": path,
                        "md5": set.count(HashAlgorithm::Md5),
                        "sha1": set.count(HashAlgorithm::Sha1),
                        "sha256": set.count(HashAlgorithm::Sha256),
                        "total": set.len(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Signature file: {}", path.display());
                    for algo in HashAlgorithm::ALL {
                        println!("  {:<8} {}", algo.as_str(), set.count(algo));
                    }
                    println!("  {:<8} {}", "total", set.len());
                }
            }
        }
        SignatureAction::Import { file } => {
            let replacement = SignatureSet::load(&file)?;
            SignatureSet::replace_file(&path, &replacement)?;
            println!("Imported {} signatures from {}", replacement.len(), file.display());
        }
        SignatureAction::Add { algorithm, digest } => {
            let algo = HashAlgorithm::from_str(&algorithm).ok_or_else(|| Error::ConfigInvalid {
                field: "algorithm".to_string(),
                message: format!("unknown digest algorithm '{}'", algorithm),
            })?;
            let mut set = SignatureSet::load_or_create(&path)?;
            if set.insert(algo, &digest) {
                set.save(&path)?;
                println!("Added {} signature", algo);
            } else {
                println!("Signature already present");
            }
        }
    }
    Ok(())
}

/// Handle configuration commands.
fn run_config(action: ConfigAction, config_path: &Path, mut config: Config) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::ExcludeAdd { path } => {
            if config.add_exclusion(path.clone()) {
                config.save(config_path)?;
                log::info!("Added exclusion: {}", path);
                println!("Excluded {}", path);
            } else {
                println!("{} is already excluded", path);
            }
        }
        ConfigAction::ExcludeRemove { path } => {
            if config.remove_exclusion(&path) {
                config.save(config_path)?;
                log::info!("Removed exclusion: {}", path);
                println!("No longer excluding {}", path);
            } else {
                println!("{} was not excluded", path);
            }
        }
        ConfigAction::Reset => {
            log::info!("Resetting configuration to defaults...");
            Config::default().save(config_path)?;
            println!("Configuration reset to defaults.");
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

/// Print the end of the activity log.
fn run_logs(config: &Config, lines: usize) -> Result<()> {
    for line in ActivityLog::tail(&config.logging.activity_log_path(), lines)? {
        println!("{}", line);
    }
    Ok(())
}
