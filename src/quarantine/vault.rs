//! Quarantine store manager.
//!
//! Contains, restores and purges files. A successful `contain` leaves exactly
//! one artifact and one metadata file with matching names in the store; a
//! successful `restore` or `purge` removes both.
//!
//! Metadata is written before the artifact is moved in, so an interrupted
//! `contain` leaves at worst an orphaned `.meta` file, never an untracked
//! artifact. [`QuarantineManager::orphaned_metadata`] finds those.

use std::fs;
use std::path::{Path, PathBuf};

use super::metadata::{
    artifact_path_for, is_artifact, metadata_path_for, QuarantineMetadata, QuarantineRecord,
    ARTIFACT_EXTENSION,
};
use super::operations::move_file;
use crate::core::error::{Error, Result};

/// Moves a file between the filesystem and the store.
type Mover = fn(&Path, &Path) -> Result<()>;

/// Quarantine store manager.
pub struct QuarantineManager {
    store: PathBuf,
    mover: Mover,
}

impl QuarantineManager {
    /// Open the store at `store`, creating the directory if needed.
    pub fn open(store: &Path) -> Result<Self> {
        fs::create_dir_all(store).map_err(|e| Error::directory_access(store, e))?;
        Ok(Self {
            store: store.to_path_buf(),
            mover: move_file,
        })
    }

    #[cfg(test)]
    fn with_mover(mut self, mover: Mover) -> Self {
        self.mover = mover;
        self
    }

    pub fn store_path(&self) -> &Path {
        &self.store
    }

    /// Move a file into quarantine.
    pub fn contain(&self, path: &Path) -> Result<QuarantineRecord> {
        let file_type = match fs::symlink_metadata(path) {
            Ok(meta) => meta.file_type(),
            Err(_) => return Err(Error::PathNotFound(path.to_path_buf())),
        };
        if file_type.is_dir() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }

        let original_path = std::path::absolute(path).map_err(|e| Error::file_read(path, e))?;
        let metadata = QuarantineMetadata::new(&original_path);
        let quarantine_path = self.unique_artifact_path(&metadata.original_name);
        let metadata_path = metadata_path_for(&quarantine_path);

        metadata.write(&metadata_path)?;

        if let Err(e) = (self.mover)(&original_path, &quarantine_path) {
            if let Err(cleanup) = fs::remove_file(&metadata_path) {
                log::warn!(
                    "Could not remove metadata {} after failed quarantine: {}",
                    metadata_path.display(),
                    cleanup
                );
            }
            log::error!("Error quarantining file {}: {}", original_path.display(), e);
            return Err(e);
        }

        log::info!(
            "File quarantined: {} -> {}",
            original_path.display(),
            quarantine_path.display()
        );
        Ok(QuarantineRecord::from_metadata(quarantine_path, metadata))
    }

    /// Move a quarantined file back to where it came from.
    ///
    /// Returns the restored path. Never overwrites an existing file.
    pub fn restore(&self, quarantine_path: &Path) -> Result<PathBuf> {
        let quarantine_path = self.resolve(quarantine_path);
        let record = self.get(&quarantine_path)?;
        let original = &record.original_path;

        if fs::symlink_metadata(original).is_ok() {
            return Err(Error::RestoreConflict(original.clone()));
        }

        if let Err(e) = (self.mover)(&quarantine_path, original) {
            log::error!(
                "Error restoring {} to {}: {}",
                quarantine_path.display(),
                original.display(),
                e
            );
            return Err(e);
        }

        if let Err(e) = fs::remove_file(&record.metadata_path) {
            log::warn!(
                "Restored {} but could not remove metadata {}: {}",
                original.display(),
                record.metadata_path.display(),
                e
            );
        }

        log::info!(
            "File restored from quarantine: {} -> {}",
            quarantine_path.display(),
            original.display()
        );
        Ok(original.clone())
    }

    /// Permanently delete a quarantined file and, if present, its metadata.
    pub fn purge(&self, quarantine_path: &Path) -> Result<()> {
        let quarantine_path = self.resolve(quarantine_path);
        if !quarantine_path.is_file() {
            return Err(Error::QuarantineItemNotFound(quarantine_path));
        }

        if let Err(e) = fs::remove_file(&quarantine_path) {
            log::error!(
                "Error deleting quarantined file {}: {}",
                quarantine_path.display(),
                e
            );
            return Err(Error::file_delete(&quarantine_path, e));
        }

        let metadata_path = metadata_path_for(&quarantine_path);
        if metadata_path.exists() {
            if let Err(e) = fs::remove_file(&metadata_path) {
                log::warn!(
                    "Could not remove metadata {}: {}",
                    metadata_path.display(),
                    e
                );
            }
        }

        log::info!("Quarantined file deleted: {}", quarantine_path.display());
        Ok(())
    }

    /// Look up one quarantined file.
    pub fn get(&self, quarantine_path: &Path) -> Result<QuarantineRecord> {
        let quarantine_path = self.resolve(quarantine_path);
        if !quarantine_path.is_file() {
            return Err(Error::QuarantineItemNotFound(quarantine_path));
        }
        let metadata_path = metadata_path_for(&quarantine_path);
        if !metadata_path.is_file() {
            return Err(Error::MetadataNotFound(metadata_path));
        }

        let metadata = QuarantineMetadata::read(&metadata_path)?;
        Ok(QuarantineRecord::from_metadata(quarantine_path, metadata))
    }

    /// All quarantined files with readable metadata, oldest first.
    pub fn list(&self) -> Result<Vec<QuarantineRecord>> {
        let mut records = Vec::new();

        for path in self.store_entries()? {
            if !is_artifact(&path) || !path.is_file() {
                continue;
            }
            let metadata_path = metadata_path_for(&path);
            if !metadata_path.exists() {
                continue;
            }
            match QuarantineMetadata::read(&metadata_path) {
                Ok(metadata) => records.push(QuarantineRecord::from_metadata(path, metadata)),
                Err(e) => log::error!(
                    "Error loading quarantine metadata for {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        records.sort_by(|a, b| {
            a.quarantine_date
                .cmp(&b.quarantine_date)
                .then_with(|| a.quarantine_path.cmp(&b.quarantine_path))
        });
        Ok(records)
    }

    /// Metadata files whose artifact is missing.
    pub fn orphaned_metadata(&self) -> Result<Vec<PathBuf>> {
        let mut orphans: Vec<PathBuf> = self
            .store_entries()?
            .into_iter()
            .filter(|path| {
                artifact_path_for(path)
                    .is_some_and(|artifact| is_artifact(&artifact) && !artifact.exists())
            })
            .collect();
        orphans.sort();
        Ok(orphans)
    }

    /// Delete orphaned metadata files. Returns how many were removed.
    pub fn remove_orphans(&self) -> Result<usize> {
        let mut removed = 0;
        for orphan in self.orphaned_metadata()? {
            fs::remove_file(&orphan).map_err(|e| Error::file_delete(&orphan, e))?;
            log::info!("Removed orphaned quarantine metadata: {}", orphan.display());
            removed += 1;
        }
        Ok(removed)
    }

    /// Bare artifact names are looked up in the store.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() && path.components().count() == 1 {
            self.store.join(path)
        } else {
            path.to_path_buf()
        }
    }

    fn store_entries(&self) -> Result<Vec<PathBuf>> {
        let entries =
            fs::read_dir(&self.store).map_err(|e| Error::directory_access(&self.store, e))?;
        Ok(entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
    }

    /// `<name>_<unix-millis>.quarantine`, with a counter if that is taken.
    fn unique_artifact_path(&self, original_name: &str) -> PathBuf {
        let stamp = chrono::Utc::now().timestamp_millis();
        let base = format!("{}_{}", original_name, stamp);

        let mut candidate = self.store.join(format!("{}.{}", base, ARTIFACT_EXTENSION));
        let mut counter = 1u32;
        while candidate.exists() || metadata_path_for(&candidate).exists() {
            candidate = self
                .store
                .join(format!("{}_{}.{}", base, counter, ARTIFACT_EXTENSION));
            counter += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quarantine::metadata::METADATA_SUFFIX;
    use tempfile::TempDir;

    fn setup() -> (TempDir, QuarantineManager) {
        let dir = TempDir::new().unwrap();
        let manager = QuarantineManager::open(&dir.path().join("quarantine")).unwrap();
        (dir, manager)
    }

    fn failing_move(_source: &Path, dest: &Path) -> Result<()> {
        Err(Error::file_write(
            dest,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "store is read-only"),
        ))
    }

    fn store_names(manager: &QuarantineManager) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(manager.store_path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_contain_creates_pair() {
        let (dir, manager) = setup();
        let evil = dir.path().join("evil.exe");
        fs::write(&evil, b"MZ evil").unwrap();

        let record = manager.contain(&evil).unwrap();
        assert!(!evil.exists());
        assert_eq!(record.original_name, "evil.exe");
        assert_eq!(record.original_path, evil);

        let names = store_names(&manager);
        assert_eq!(names.len(), 2);
        let artifact = names.iter().find(|n| n.ends_with(".quarantine")).unwrap();
        assert!(artifact.starts_with("evil.exe_"));
        assert!(names.contains(&format!("{}{}", artifact, METADATA_SUFFIX)));
        assert_eq!(record.artifact_name(), *artifact);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let (dir, manager) = setup();
        let original = dir.path().join("docs").join("report.bat");
        fs::create_dir_all(original.parent().unwrap()).unwrap();
        let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fs::write(&original, &content).unwrap();

        let record = manager.contain(&original).unwrap();
        // Parent removed in the meantime
        fs::remove_dir(original.parent().unwrap()).unwrap();

        let restored = manager.restore(&record.quarantine_path).unwrap();
        assert_eq!(restored, original);
        assert_eq!(fs::read(&original).unwrap(), content);
        assert!(store_names(&manager).is_empty());
    }

    #[test]
    fn test_second_restore_not_found() {
        let (dir, manager) = setup();
        let file = dir.path().join("a.vbs");
        fs::write(&file, b"x").unwrap();

        let record = manager.contain(&file).unwrap();
        manager.restore(&record.quarantine_path).unwrap();

        let err = manager.restore(&record.quarantine_path).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_contain_missing_file() {
        let (dir, manager) = setup();
        let result = manager.contain(&dir.path().join("gone.exe"));
        assert!(matches!(result, Err(Error::PathNotFound(_))));
        assert!(store_names(&manager).is_empty());
    }

    #[test]
    fn test_failed_move_rolls_back_metadata() {
        let (dir, manager) = setup();
        let manager = manager.with_mover(failing_move);
        let file = dir.path().join("stuck.exe");
        fs::write(&file, b"MZ stuck").unwrap();

        assert!(manager.contain(&file).is_err());
        assert!(store_names(&manager).is_empty());
        assert_eq!(fs::read(&file).unwrap(), b"MZ stuck");
        assert!(manager.orphaned_metadata().unwrap().is_empty());
    }

    #[test]
    fn test_failed_restore_keeps_pair() {
        let (dir, manager) = setup();
        let file = dir.path().join("pinned.exe");
        fs::write(&file, b"x").unwrap();
        let record = manager.contain(&file).unwrap();

        let manager = manager.with_mover(failing_move);
        assert!(manager.restore(&record.quarantine_path).is_err());
        assert!(!file.exists());
        assert!(record.quarantine_path.exists());
        assert!(record.metadata_path.exists());
        assert_eq!(manager.list().unwrap(), vec![record]);
    }

    #[test]
    fn test_contain_directory_rejected() {
        let (dir, manager) = setup();
        let sub = dir.path().join("folder");
        fs::create_dir(&sub).unwrap();
        assert!(matches!(manager.contain(&sub), Err(Error::NotAFile(_))));
        assert!(sub.exists());
    }

    #[test]
    fn test_restore_without_metadata() {
        let (dir, manager) = setup();
        let file = dir.path().join("b.exe");
        fs::write(&file, b"x").unwrap();
        let record = manager.contain(&file).unwrap();
        fs::remove_file(&record.metadata_path).unwrap();

        assert!(matches!(
            manager.restore(&record.quarantine_path),
            Err(Error::MetadataNotFound(_))
        ));
        assert!(record.quarantine_path.exists());
    }

    #[test]
    fn test_restore_refuses_overwrite() {
        let (dir, manager) = setup();
        let file = dir.path().join("c.exe");
        fs::write(&file, b"quarantined").unwrap();
        let record = manager.contain(&file).unwrap();
        fs::write(&file, b"new file").unwrap();

        assert!(matches!(
            manager.restore(&record.quarantine_path),
            Err(Error::RestoreConflict(_))
        ));
        assert_eq!(fs::read(&file).unwrap(), b"new file");
        assert!(record.quarantine_path.exists());
        assert!(record.metadata_path.exists());
    }

    #[test]
    fn test_purge_removes_both() {
        let (dir, manager) = setup();
        let file = dir.path().join("d.ps1");
        fs::write(&file, b"x").unwrap();
        let record = manager.contain(&file).unwrap();

        manager.purge(&record.quarantine_path).unwrap();
        assert!(store_names(&manager).is_empty());
        assert!(!file.exists());
        assert!(manager.purge(&record.quarantine_path).unwrap_err().is_not_found());
    }

    #[test]
    fn test_purge_without_metadata() {
        let (dir, manager) = setup();
        let file = dir.path().join("e.dll");
        fs::write(&file, b"x").unwrap();
        let record = manager.contain(&file).unwrap();
        fs::remove_file(&record.metadata_path).unwrap();

        manager.purge(&record.quarantine_path).unwrap();
        assert!(store_names(&manager).is_empty());
    }

    #[test]
    fn test_bare_name_resolves_in_store() {
        let (dir, manager) = setup();
        let file = dir.path().join("f.jar");
        fs::write(&file, b"PK").unwrap();
        let record = manager.contain(&file).unwrap();

        let by_name = manager.get(Path::new(&record.artifact_name())).unwrap();
        assert_eq!(by_name, record);
        manager.purge(Path::new(&record.artifact_name())).unwrap();
    }

    #[test]
    fn test_same_name_does_not_collide() {
        let (dir, manager) = setup();
        let file = dir.path().join("twin.exe");

        fs::write(&file, b"one").unwrap();
        let first = manager.contain(&file).unwrap();
        fs::write(&file, b"two").unwrap();
        let second = manager.contain(&file).unwrap();

        assert_ne!(first.quarantine_path, second.quarantine_path);
        assert_eq!(store_names(&manager).len(), 4);
        assert_eq!(manager.list().unwrap().len(), 2);
    }

    #[test]
    fn test_list_skips_unreadable_metadata() {
        let (dir, manager) = setup();
        let file = dir.path().join("g.exe");
        fs::write(&file, b"x").unwrap();
        let good = manager.contain(&file).unwrap();

        let bad = manager.store_path().join("broken.exe_1.quarantine");
        fs::write(&bad, b"x").unwrap();
        fs::write(metadata_path_for(&bad), b"not json").unwrap();
        fs::write(manager.store_path().join("untracked.exe_2.quarantine"), b"x").unwrap();

        let listed = manager.list().unwrap();
        assert_eq!(listed, vec![good]);
    }

    #[test]
    fn test_orphaned_metadata() {
        let (dir, manager) = setup();
        let file = dir.path().join("h.exe");
        fs::write(&file, b"x").unwrap();
        let record = manager.contain(&file).unwrap();

        let orphan = manager.store_path().join("lost.exe_5.quarantine.meta");
        QuarantineMetadata::new(Path::new("/tmp/lost.exe"))
            .write(&orphan)
            .unwrap();

        assert_eq!(manager.orphaned_metadata().unwrap(), vec![orphan.clone()]);
        assert_eq!(manager.remove_orphans().unwrap(), 1);
        assert!(!orphan.exists());
        assert!(record.metadata_path.exists());
        assert!(manager.orphaned_metadata().unwrap().is_empty());
    }
}
