//! File operations used by the quarantine store.

use std::fs;
use std::path::Path;

use crate::core::error::{Error, Result};

/// Move a file, falling back to copy-then-delete when `rename` fails
/// (typically because source and destination are on different devices).
pub fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::directory_access(parent, e))?;
    }

    // Fast path for same filesystem
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    copy_then_remove(source, dest)
}

/// Copy `source` to `dest`, verify the size, then delete `source`.
///
/// On failure at most one of the two files remains.
fn copy_then_remove(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest).map_err(|e| Error::FileMove {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: e,
    })?;

    let source_size = fs::metadata(source)
        .map_err(|e| Error::file_read(source, e))?
        .len();
    let dest_size = fs::metadata(dest)
        .map_err(|e| Error::file_read(dest, e))?
        .len();
    if source_size != dest_size {
        let _ = fs::remove_file(dest);
        return Err(Error::Io(format!(
            "copy verification failed for {}",
            dest.display()
        )));
    }

    if let Err(e) = fs::remove_file(source) {
        // Leave exactly one copy behind
        let _ = fs::remove_file(dest);
        return Err(Error::file_delete(source, e));
    }

    Ok(())
}

/// Write a file via a temporary sibling and a rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    fs::write(&tmp_path, contents).map_err(|e| Error::file_write(&tmp_path, e))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::file_write(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_file_creates_parent() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.bin");
        let dest = dir.path().join("nested").join("deeper").join("a.bin");
        fs::write(&source, b"payload").unwrap();

        move_file(&source, &dest).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_move_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = move_file(&dir.path().join("missing"), &dir.path().join("dest"));
        assert!(matches!(result, Err(Error::FileMove { .. })));
        assert!(!dir.path().join("dest").exists());
    }

    #[test]
    fn test_copy_fallback_moves_content() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("payload.exe");
        let dest = dir.path().join("payload.exe_1.quarantine");
        let content: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        fs::write(&source, &content).unwrap();

        copy_then_remove(&source, &dest).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), content);
    }

    #[test]
    fn test_copy_fallback_failure_leaves_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("payload.exe");
        let dest = dir.path().join("no-such-dir").join("payload.exe");
        fs::write(&source, b"MZ").unwrap();

        let result = copy_then_remove(&source, &dest);
        assert!(matches!(result, Err(Error::FileMove { .. })));
        assert_eq!(fs::read(&source).unwrap(), b"MZ");
        assert!(!dest.exists());
    }

    #[test]
    fn test_write_atomic_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("record.meta");
        write_atomic(&path, b"{}").unwrap();
        write_atomic(&path, b"{\"a\":1}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{\"a\":1}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
