use crate::error::{OpsError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// An interrupted run never leaves a half-written config behind.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Insert `block` into a file immediately before the first occurrence of
/// `marker`. Returns an error if the file or the marker is missing.
pub fn insert_before_marker(path: &Path, marker: &str, block: &str) -> Result<()> {
    if !path.exists() {
        return Err(OpsError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let Some(pos) = content.find(marker) else {
        return Err(OpsError::MarkerNotFound {
            marker: marker.to_string(),
            file: path.to_path_buf(),
        });
    };
    let mut updated = String::with_capacity(content.len() + block.len());
    updated.push_str(&content[..pos]);
    updated.push_str(block);
    updated.push_str(&content[pos..]);
    atomic_write(path, updated.as_bytes())
}

/// Copy `path` to `<path>.backup` unless a backup already exists.
/// Returns the backup path when a copy was made.
pub fn backup_once(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Err(OpsError::FileNotFound(path.to_path_buf()));
    }
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".backup");
    let backup = path.with_file_name(name);
    if backup.exists() {
        return Ok(None);
    }
    std::fs::copy(path, &backup)?;
    Ok(Some(backup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("service.env");
        atomic_write(&path, b"KEY=value").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "KEY=value");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("supabase/volumes/api/kong.yml");
        atomic_write(&path, b"services:").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn write_if_missing_skips_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, b"original").unwrap();
        assert!(!write_if_missing(&path, b"new").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn insert_before_marker_places_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kong.yml");
        std::fs::write(&path, "a\n## marker\nb\n").unwrap();
        insert_before_marker(&path, "## marker", "inserted\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "a\ninserted\n## marker\nb\n"
        );
    }

    #[test]
    fn insert_before_missing_marker_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kong.yml");
        std::fs::write(&path, "no routes here\n").unwrap();
        let err = insert_before_marker(&path, "## marker", "x").unwrap_err();
        assert!(matches!(err, OpsError::MarkerNotFound { .. }));
    }

    #[test]
    fn backup_once_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "v1").unwrap();
        let first = backup_once(&path).unwrap();
        assert!(first.is_some());
        std::fs::write(&path, "v2").unwrap();
        let second = backup_once(&path).unwrap();
        assert!(second.is_none());
        let backup = dir.path().join(".env.backup");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "v1");
    }
}
