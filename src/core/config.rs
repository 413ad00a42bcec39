//! Configuration management for ArcSentinel.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// On-demand scan settings
    #[serde(default)]
    pub scan: ScanConfig,
    /// Real-time protection settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Locations of persisted stores
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigSave(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| Error::ConfigSave(format!("Failed to write config file: {}", e)))
    }

    /// Load configuration from default location, or create default if not exists.
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    log::warn!("Failed to load config, using defaults: {}", e);
                    return Self::default();
                }
            }
        }

        let config = Self::default();
        if let Err(e) = config.save(&config_path) {
            log::warn!("Failed to save default config: {}", e);
        }

        config
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        Self::data_dir().join("settings.json")
    }

    /// Get the application data directory.
    pub fn data_dir() -> PathBuf {
        #[cfg(windows)]
        {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData"))
                .join("ArcSentinel")
        }

        #[cfg(not(windows))]
        {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("arc-sentinel")
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.scan.skip_large_files_mb == 0 {
            return Err(Error::ConfigInvalid {
                field: "scan.skip_large_files_mb".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.monitor.poll_interval_secs == 0 {
            return Err(Error::ConfigInvalid {
                field: "monitor.poll_interval_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.monitor.watch_state_capacity == 0 {
            return Err(Error::ConfigInvalid {
                field: "monitor.watch_state_capacity".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Add a path to the exclusion list. Returns false if it was already present.
    pub fn add_exclusion(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if path.trim().is_empty() || self.scan.excluded_paths.contains(&path) {
            return false;
        }
        self.scan.excluded_paths.push(path);
        true
    }

    /// Remove a path from the exclusion list. Returns false if it was not present.
    pub fn remove_exclusion(&mut self, path: &str) -> bool {
        let before = self.scan.excluded_paths.len();
        self.scan.excluded_paths.retain(|p| p != path);
        self.scan.excluded_paths.len() != before
    }
}

/// On-demand scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory prefixes that are never inspected
    pub excluded_paths: Vec<String>,
    /// Whether to look inside archives (recorded for the settings UI; archives
    /// are currently hashed as opaque files)
    pub scan_archives: bool,
    /// Skip files larger than this size (MB)
    pub skip_large_files_mb: u64,
    /// Extensions eligible for heuristic analysis during scans
    pub heuristic_extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            excluded_paths: Vec::new(),
            scan_archives: true,
            skip_large_files_mb: 100,
            heuristic_extensions: ["exe", "dll", "bat", "vbs", "ps1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ScanConfig {
    /// Size threshold in bytes above which files are skipped.
    pub fn max_file_size(&self) -> u64 {
        self.skip_large_files_mb * 1024 * 1024
    }
}

/// Real-time protection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Start real-time protection with the application
    pub real_time_protection: bool,
    /// Seconds between sweeps of the watched directories
    pub poll_interval_secs: u64,
    /// Seconds before the same path is inspected again
    pub cooldown_secs: u64,
    /// Maximum number of paths remembered for the cool-down
    pub watch_state_capacity: usize,
    /// Extensions the monitor inspects (also used for heuristics)
    pub watched_extensions: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            real_time_protection: true,
            poll_interval_secs: 2,
            cooldown_secs: 300,
            watch_state_capacity: 10_000,
            watched_extensions: ["exe", "dll", "bat", "vbs", "ps1", "js", "jar"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Path of the activity log file
    pub log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_path: None,
        }
    }
}

impl LoggingConfig {
    /// Get the effective activity log path.
    pub fn activity_log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("activity.log"))
    }
}

/// Locations of the persisted stores this engine mutates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Signature file
    pub signatures_path: Option<PathBuf>,
    /// Scan history file
    pub history_path: Option<PathBuf>,
    /// Quarantine directory
    pub quarantine_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Get the effective signature file path.
    pub fn signatures_file(&self) -> PathBuf {
        self.signatures_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("signatures.json"))
    }

    /// Get the effective scan history path.
    pub fn history_file(&self) -> PathBuf {
        self.history_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("scan_history.jsonl"))
    }

    /// Get the effective quarantine directory.
    pub fn quarantine_dir(&self) -> PathBuf {
        self.quarantine_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("quarantine"))
    }
}
