//! Logging infrastructure for ArcSentinel.
//!
//! Records go to the console through `env_logger` and, when enabled, are
//! also appended to the activity log that the front end displays.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use chrono::Local;
use env_logger::Builder;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Logging configuration.
pub struct LogConfig {
    /// Log level
    pub level: LevelFilter,
    /// Activity log file path (None disables the file sink)
    pub file_path: Option<PathBuf>,
    /// Show timestamps on the console
    pub timestamps: bool,
    /// Show module path on the console
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            timestamps: true,
            module_path: false,
        }
    }
}

impl LogConfig {
    /// Create a log config from application config.
    pub fn from_config(config: &Config) -> Self {
        let level = parse_level(&config.logging.log_level);

        Self {
            level,
            file_path: Some(config.logging.activity_log_path()),
            timestamps: true,
            module_path: level == LevelFilter::Debug || level == LevelFilter::Trace,
        }
    }

    /// Raise the level to debug for CLI verbose mode.
    pub fn verbose(mut self) -> Self {
        self.level = LevelFilter::Debug;
        self.module_path = true;
        self
    }
}

fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Initialize the logging system.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let mut builder = Builder::new();
    builder.filter_level(config.level);

    let timestamps = config.timestamps;
    let module_path = config.module_path;
    builder.format(move |buf, record| {
        let mut output = String::new();

        if timestamps {
            output.push_str(&format!("{} ", Local::now().format("%Y-%m-%d %H:%M:%S")));
        }

        let level_str = match record.level() {
            log::Level::Error => "\x1b[31mERROR\x1b[0m",
            log::Level::Warn => "\x1b[33mWARN\x1b[0m ",
            log::Level::Info => "\x1b[32mINFO\x1b[0m ",
            log::Level::Debug => "\x1b[34mDEBUG\x1b[0m",
            log::Level::Trace => "\x1b[35mTRACE\x1b[0m",
        };
        output.push_str(&format!("[{}] ", level_str));

        if module_path {
            if let Some(path) = record.module_path() {
                output.push_str(&format!("{}: ", path));
            }
        }

        output.push_str(&format!("{}", record.args()));
        writeln!(buf, "{}", output)
    });

    let console = builder.build();
    let activity = match config.file_path {
        Some(ref path) => Some(Mutex::new(ActivityLog::open(path)?)),
        None => None,
    };

    let max_level = console.filter();
    log::set_boxed_logger(Box::new(TeeLogger { console, activity }))
        .map_err(|e| Error::Io(format!("Logger already initialized: {}", e)))?;
    log::set_max_level(max_level);

    log::debug!("Logging initialized with level: {:?}", config.level);
    Ok(())
}

/// Sends each record to the console logger and the activity log.
struct TeeLogger {
    console: env_logger::Logger,
    activity: Option<Mutex<ActivityLog>>,
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.console.matches(record) {
            return;
        }
        self.console.log(record);

        if let Some(activity) = &self.activity {
            if let Ok(mut file) = activity.lock() {
                // Nowhere left to report a failing log sink.
                let _ = file.record(record.level(), &record.args().to_string());
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(activity) = &self.activity {
            if let Ok(mut file) = activity.lock() {
                let _ = file.file.flush();
            }
        }
    }
}

/// Append-only activity log file.
pub struct ActivityLog {
    file: File,
}

impl ActivityLog {
    /// Open (or create) the activity log for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::file_write(path, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::file_write(path, e))?;

        Ok(Self { file })
    }

    /// Append one entry.
    pub fn record(&mut self, level: log::Level, message: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let level = level.to_string().to_uppercase();
        writeln!(self.file, "[{}] [{}] {}", timestamp, level, message)
            .map_err(|e| Error::Io(format!("Failed to write log: {}", e)))
    }

    /// Read the last `lines` entries of an activity log.
    pub fn tail(path: &Path, lines: usize) -> Result<Vec<String>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let all: Vec<&str> = contents.lines().collect();
        let start = all.len().saturating_sub(lines);
        Ok(all[start..].iter().map(|l| l.to_string()).collect())
    }
}
