use stackops_core::paths;
use stackops_core::{OpsError, Result};
use std::path::{Path, PathBuf};

/// Resolve the installation root.
///
/// Priority:
/// 1. `--root` flag / `STACKOPS_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for an installation root
///    (docker-compose.yml plus stackend/ and stackweb/)
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut dir = cwd.clone();
    loop {
        if paths::is_install_root(&dir) {
            return dir;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }

    cwd
}

/// Commands that edit an installation refuse to run against a directory
/// that doesn't look like one.
pub fn require_install_root(root: &Path) -> Result<()> {
    if paths::is_install_root(root) {
        Ok(())
    } else {
        Err(OpsError::NotAnInstallRoot(root.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn require_install_root_checks_markers() {
        let dir = TempDir::new().unwrap();
        assert!(require_install_root(dir.path()).is_err());
        std::fs::write(dir.path().join("docker-compose.yml"), "services:\n").unwrap();
        std::fs::create_dir(dir.path().join("stackend")).unwrap();
        std::fs::create_dir(dir.path().join("stackweb")).unwrap();
        assert!(require_install_root(dir.path()).is_ok());
    }
}
