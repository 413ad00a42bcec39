//! Error types and result handling for ArcSentinel.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ArcSentinel operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== I/O Errors =====
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file: {path}")]
    FileDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}")]
    FileMove {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to access directory: {path}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(String),

    // ===== Not Found =====
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Quarantined file not found: {0}")]
    QuarantineItemNotFound(PathBuf),

    #[error("Quarantine metadata missing: {0}")]
    MetadataNotFound(PathBuf),

    // ===== Concurrency Errors =====
    #[error("A scan is already running")]
    ScanAlreadyRunning,

    #[error("Real-time protection is already running")]
    MonitorAlreadyRunning,

    #[error("Failed to spawn worker thread: {name}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),

    // ===== Configuration Errors =====
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    // ===== Signature Errors =====
    #[error("Failed to load signatures: {0}")]
    SignatureLoad(String),

    #[error("Failed to save signatures: {0}")]
    SignatureSave(String),

    // ===== Quarantine Errors =====
    #[error("Cannot restore, a file already exists at {0}")]
    RestoreConflict(PathBuf),

    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    // ===== Serialization Errors =====
    #[error("JSON serialization error")]
    JsonSerialize(#[from] serde_json::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a file delete error.
    pub fn file_delete(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileDelete {
            path: path.into(),
            source,
        }
    }

    /// Create a directory access error.
    pub fn directory_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryAccess {
            path: path.into(),
            source,
        }
    }

    /// Check if this error means the subject of an operation is gone.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Check if this error is recoverable (the caller can carry on).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Io | ErrorCategory::NotFound | ErrorCategory::AlreadyRunning
        )
    }

    /// Get a user-friendly suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::PathNotFound(_) => Some("Check that the path exists and is accessible"),
            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } => {
                Some("Check your configuration file for syntax errors or missing fields")
            }
            Error::SignatureLoad(_) => {
                Some("Delete the signature file to recreate an empty one, then re-import")
            }
            Error::ScanAlreadyRunning => {
                Some("Wait for the current scan to finish or cancel it first")
            }
            Error::QuarantineItemNotFound(_) | Error::MetadataNotFound(_) => {
                Some("The quarantine item may have been purged or already restored")
            }
            Error::RestoreConflict(_) => {
                Some("Move or rename the existing file before restoring")
            }
            _ => None,
        }
    }

    /// Get the error category for logging and collaborator results.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FileRead { .. }
            | Error::FileWrite { .. }
            | Error::FileDelete { .. }
            | Error::FileMove { .. }
            | Error::DirectoryAccess { .. }
            | Error::Io(_) => ErrorCategory::Io,

            Error::PathNotFound(_)
            | Error::QuarantineItemNotFound(_)
            | Error::MetadataNotFound(_) => ErrorCategory::NotFound,

            Error::ScanAlreadyRunning | Error::MonitorAlreadyRunning => {
                ErrorCategory::AlreadyRunning
            }

            Error::WorkerSpawn { .. } | Error::WorkerPanicked(_) => ErrorCategory::Concurrency,

            Error::ConfigLoad(_) | Error::ConfigSave(_) | Error::ConfigInvalid { .. } => {
                ErrorCategory::Configuration
            }

            Error::SignatureLoad(_) | Error::SignatureSave(_) => ErrorCategory::Signatures,

            Error::RestoreConflict(_) | Error::NotAFile(_) => ErrorCategory::Quarantine,

            Error::JsonSerialize(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Io,
    NotFound,
    AlreadyRunning,
    Configuration,
    Signatures,
    Quarantine,
    Concurrency,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "I/O"),
            Self::NotFound => write!(f, "Not Found"),
            Self::AlreadyRunning => write!(f, "Already Running"),
            Self::Configuration => write!(f, "Configuration"),
            Self::Signatures => write!(f, "Signatures"),
            Self::Quarantine => write!(f, "Quarantine"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::Serialization => write!(f, "Serialization"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PathNotFound(PathBuf::from("/test/path"));
        assert_eq!(err.to_string(), "Path not found: /test/path");
    }

    #[test]
    fn test_not_found_category() {
        assert!(Error::QuarantineItemNotFound(PathBuf::from("x.quarantine")).is_not_found());
        assert!(Error::MetadataNotFound(PathBuf::from("x.quarantine.meta")).is_not_found());
        assert!(!Error::ScanAlreadyRunning.is_not_found());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::ScanAlreadyRunning.is_recoverable());
        assert!(Error::Io("disk".to_string()).is_recoverable());
        assert!(!Error::ConfigLoad("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_suggestion() {
        assert!(Error::ScanAlreadyRunning.suggestion().is_some());
        assert!(Error::Io("x".to_string()).suggestion().is_none());
    }
}
