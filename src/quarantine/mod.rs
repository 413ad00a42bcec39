//! Quarantine store management.
//!
//! This module handles:
//! - Moving detected files into the quarantine store
//! - Sidecar metadata for restoration
//! - File restoration and deletion
//! - Detection of metadata left behind by interrupted operations

pub mod metadata;
pub mod operations;
pub mod vault;

use serde::Serialize;
use std::path::PathBuf;

use crate::core::error::Result;

pub use metadata::{QuarantineMetadata, QuarantineRecord};
pub use vault::QuarantineManager;

/// Result of a quarantine operation as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantineOutcome {
    pub success: bool,
    pub message: String,
    /// Set on a successful contain, for later restore or purge
    pub quarantine_path: Option<PathBuf>,
}

impl QuarantineOutcome {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            quarantine_path: None,
        }
    }

    pub fn contained(result: &Result<QuarantineRecord>) -> Self {
        match result {
            Ok(record) => Self {
                success: true,
                message: "File successfully quarantined".to_string(),
                quarantine_path: Some(record.quarantine_path.clone()),
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }

    pub fn restored(result: &Result<PathBuf>) -> Self {
        match result {
            Ok(path) => Self {
                success: true,
                message: format!("File successfully restored to {}", path.display()),
                quarantine_path: None,
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }

    pub fn purged(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                message: "File successfully deleted".to_string(),
                quarantine_path: None,
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
