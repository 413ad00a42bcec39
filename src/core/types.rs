//! Core type definitions used throughout ArcSentinel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Digest algorithm a signature is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// All supported algorithms.
    pub const ALL: [HashAlgorithm; 3] = [HashAlgorithm::Md5, HashAlgorithm::Sha1, HashAlgorithm::Sha256];

    /// Get the key used in the signature file.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "md5" => Some(HashAlgorithm::Md5),
            "sha1" | "sha-1" => Some(HashAlgorithm::Sha1),
            "sha256" | "sha-256" => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a file was not inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum SkipReason {
    /// Larger than the configured size threshold
    Oversize,
    /// Under an excluded path
    Excluded,
    /// The file could not be read
    Io(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Oversize => write!(f, "file too large"),
            SkipReason::Excluded => write!(f, "excluded path"),
            SkipReason::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

/// Outcome of inspecting a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "detail")]
pub enum Verdict {
    Clean,
    /// Content digest is a known signature
    SignatureMatch(HashAlgorithm),
    /// Content contains a suspicious pattern
    HeuristicMatch(String),
    Skipped(SkipReason),
}

impl Verdict {
    /// Whether the verdict should be reported as a threat.
    pub fn is_threat(&self) -> bool {
        matches!(self, Verdict::SignatureMatch(_) | Verdict::HeuristicMatch(_))
    }

    /// Human-readable threat description, if this verdict is a threat.
    pub fn threat_description(&self) -> Option<String> {
        match self {
            Verdict::SignatureMatch(algo) => Some(format!("Malware signature match ({})", algo)),
            Verdict::HeuristicMatch(pattern) => {
                Some(format!("Suspicious behavior detected: {}", pattern))
            }
            Verdict::Clean | Verdict::Skipped(_) => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Clean => write!(f, "Clean"),
            Verdict::SignatureMatch(algo) => write!(f, "Signature match ({})", algo),
            Verdict::HeuristicMatch(pattern) => write!(f, "Heuristic match ({})", pattern),
            Verdict::Skipped(reason) => write!(f, "Skipped ({})", reason),
        }
    }
}

/// How a scan target is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalMode {
    SingleFile,
    Recursive,
}

/// A root path handed to the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub path: PathBuf,
    pub mode: TraversalMode,
}

impl ScanTarget {
    /// Create a target that scans one file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: TraversalMode::SingleFile,
        }
    }

    /// Create a target that walks a directory tree.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: TraversalMode::Recursive,
        }
    }

    /// Pick the traversal mode from what is on disk.
    pub fn from_path(path: &Path) -> Self {
        if path.is_dir() {
            Self::directory(path)
        } else {
            Self::file(path)
        }
    }
}

/// Type of scan to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    /// Quick scan of common malware locations
    Quick,
    /// Full system scan
    Full,
    /// Custom scan of user-selected paths
    Custom,
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanType::Quick => write!(f, "Quick Scan"),
            ScanType::Full => write!(f, "Full Scan"),
            ScanType::Custom => write!(f, "Custom Scan"),
        }
    }
}

/// Final status of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Every target was walked
    Completed,
    /// Stopped early by a cancel request
    Cancelled,
}

/// Aggregate of one scanner run, appended to the scan history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique scan identifier
    pub scan_id: String,
    pub scan_type: ScanType,
    pub status: ScanStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Files processed, including skipped ones
    pub scanned_files: u64,
    /// Files that could not be inspected
    pub skipped_files: u64,
    /// Files flagged as threats
    pub infected_files: u64,
    /// Infected paths in the order they were found
    pub infected_file_paths: Vec<PathBuf>,
    pub duration_secs: f64,
}

impl ScanReport {
    /// Whether the scan was cut short.
    pub fn is_incomplete(&self) -> bool {
        self.status == ScanStatus::Cancelled
    }

    /// Human-readable completion time.
    pub fn timestamp(&self) -> String {
        self.finished_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_parse() {
        assert_eq!(HashAlgorithm::from_str("SHA256"), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_str("sha-1"), Some(HashAlgorithm::Sha1));
        assert_eq!(HashAlgorithm::from_str("crc32"), None);
        for algo in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_str(algo.as_str()), Some(algo));
        }
    }

    #[test]
    fn test_verdict_threat() {
        assert!(Verdict::SignatureMatch(HashAlgorithm::Md5).is_threat());
        assert!(Verdict::HeuristicMatch("cmd.exe /c".to_string()).is_threat());
        assert!(!Verdict::Clean.is_threat());
        assert!(!Verdict::Skipped(SkipReason::Oversize).is_threat());
        assert_eq!(
            Verdict::SignatureMatch(HashAlgorithm::Sha256)
                .threat_description()
                .as_deref(),
            Some("Malware signature match (sha256)")
        );
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_string(&Verdict::Skipped(SkipReason::Excluded)).unwrap();
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Verdict::Skipped(SkipReason::Excluded));
    }

    #[test]
    fn test_scan_target_from_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ScanTarget::from_path(dir.path()).mode, TraversalMode::Recursive);

        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(ScanTarget::from_path(&file).mode, TraversalMode::SingleFile);
    }
}
