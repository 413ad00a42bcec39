//! Scan target selection for quick, full and custom scans.

use crate::core::error::{Error, Result};
use crate::core::types::ScanTarget;
use std::path::PathBuf;

/// Common malware drop locations that exist on this machine.
pub fn quick_scan_targets() -> Vec<ScanTarget> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    candidates.extend(dirs::download_dir());
    candidates.extend(dirs::desktop_dir());
    candidates.push(std::env::temp_dir());

    #[cfg(windows)]
    {
        if let Some(program_data) = std::env::var_os("ProgramData") {
            candidates.push(
                PathBuf::from(program_data)
                    .join("Microsoft\\Windows\\Start Menu\\Programs\\Startup"),
            );
        }
        if let Some(app_data) = dirs::config_dir() {
            candidates.push(app_data.join("Microsoft\\Windows\\Start Menu\\Programs\\Startup"));
        }
    }

    #[cfg(not(windows))]
    {
        if let Some(config) = dirs::config_dir() {
            candidates.push(config.join("autostart"));
        }
    }

    candidates.dedup();
    candidates
        .into_iter()
        .filter(|p| p.exists())
        .map(ScanTarget::directory)
        .collect()
}

/// The system root.
pub fn full_scan_targets() -> Vec<ScanTarget> {
    #[cfg(windows)]
    let root = {
        let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
        PathBuf::from(format!("{}\\", drive))
    };

    #[cfg(not(windows))]
    let root = PathBuf::from("/");

    vec![ScanTarget::directory(root)]
}

/// User-selected paths. Every path must exist.
pub fn custom_scan_targets(paths: &[PathBuf]) -> Result<Vec<ScanTarget>> {
    paths
        .iter()
        .map(|path| {
            if path.exists() {
                Ok(ScanTarget::from_path(path))
            } else {
                Err(Error::PathNotFound(path.clone()))
            }
        })
        .collect()
}
