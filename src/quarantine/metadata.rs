//! Quarantine metadata sidecar files.
//!
//! Every quarantined artifact `<name>.quarantine` is paired with a JSON file
//! `<name>.quarantine.meta` in the same directory. The pairing is positional:
//! nothing else links the two.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::operations::write_atomic;
use crate::core::error::{Error, Result};

/// Extension of quarantined artifacts.
pub const ARTIFACT_EXTENSION: &str = "quarantine";

/// Suffix appended to an artifact name to form its metadata name.
pub const METADATA_SUFFIX: &str = ".meta";

/// Format of `quarantine_date`, in local time.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Contents of a `.meta` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineMetadata {
    /// Absolute path the file was taken from
    pub original_path: PathBuf,
    /// Human-readable quarantine time
    pub quarantine_date: String,
    /// File name at the original location
    pub original_name: String,
}

impl QuarantineMetadata {
    /// Metadata for a file being quarantined now.
    pub fn new(original_path: &Path) -> Self {
        let original_name = original_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            original_path: original_path.to_path_buf(),
            quarantine_date: Local::now().format(DATE_FORMAT).to_string(),
            original_name,
        }
    }

    /// Read a metadata file.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the metadata file. Readers never see a partial file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &contents)
    }

    /// Parsed quarantine time, if the date is well-formed.
    pub fn quarantined_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.quarantine_date, DATE_FORMAT).ok()
    }
}

/// Metadata path paired with an artifact.
pub fn metadata_path_for(artifact: &Path) -> PathBuf {
    let mut name: OsString = artifact.as_os_str().to_owned();
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

/// Artifact path paired with a metadata file, if it has the metadata suffix.
pub fn artifact_path_for(metadata: &Path) -> Option<PathBuf> {
    let name = metadata.file_name()?.to_str()?;
    let artifact = name.strip_suffix(METADATA_SUFFIX)?;
    if artifact.is_empty() {
        return None;
    }
    Some(metadata.with_file_name(artifact))
}

/// Whether a path names a quarantined artifact.
pub fn is_artifact(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
}

/// A quarantined file and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantineRecord {
    /// Location of the artifact in the store
    pub quarantine_path: PathBuf,
    /// Location of the paired metadata file
    pub metadata_path: PathBuf,
    pub original_path: PathBuf,
    pub original_name: String,
    pub quarantine_date: String,
}

impl QuarantineRecord {
    pub(crate) fn from_metadata(quarantine_path: PathBuf, metadata: QuarantineMetadata) -> Self {
        let metadata_path = metadata_path_for(&quarantine_path);
        Self {
            quarantine_path,
            metadata_path,
            original_path: metadata.original_path,
            original_name: metadata.original_name,
            quarantine_date: metadata.quarantine_date,
        }
    }

    /// Artifact file name within the store.
    pub fn artifact_name(&self) -> String {
        self.quarantine_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_pairing() {
        let artifact = Path::new("/store/evil.exe_1700000000000.quarantine");
        let meta = metadata_path_for(artifact);
        assert_eq!(
            meta,
            PathBuf::from("/store/evil.exe_1700000000000.quarantine.meta")
        );
        assert_eq!(artifact_path_for(&meta).as_deref(), Some(artifact));
        assert!(artifact_path_for(Path::new("/store/.meta")).is_none());
        assert!(artifact_path_for(Path::new("/store/notes.txt")).is_none());
        assert!(is_artifact(artifact));
        assert!(!is_artifact(&meta));
    }

    #[test]
    fn test_metadata_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.quarantine.meta");
        let metadata = QuarantineMetadata::new(Path::new("/home/user/Downloads/evil.exe"));
        metadata.write(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["original_path"], "/home/user/Downloads/evil.exe");
        assert_eq!(raw["original_name"], "evil.exe");
        assert!(raw["quarantine_date"].is_string());

        let back = QuarantineMetadata::read(&path).unwrap();
        assert_eq!(back, metadata);
        assert!(back.quarantined_at().is_some());
    }

    #[test]
    fn test_reads_original_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.quarantine.meta");
        fs::write(
            &path,
            r#"{"original_path": "C:\\Users\\me\\Desktop\\a.bat", "quarantine_date": "2024-03-01 12:30:00", "original_name": "a.bat"}"#,
        )
        .unwrap();

        let metadata = QuarantineMetadata::read(&path).unwrap();
        assert_eq!(metadata.original_name, "a.bat");
        assert_eq!(
            metadata.quarantined_at().unwrap().format(DATE_FORMAT).to_string(),
            "2024-03-01 12:30:00"
        );
    }
}
