//! Locations inside a StackAI on-premise installation.
//!
//! An installation root is the checkout that operators run `docker compose`
//! from: it contains a top-level docker-compose.yml plus one directory per
//! service, each holding that service's `.env`.

use std::path::{Path, PathBuf};

/// Service directories that carry an operator-owned `.env` file.
pub const SERVICE_DIRS: &[&str] = &[
    "caddy",
    "mongodb",
    "stackend",
    "stackrepl",
    "stackweb",
    "supabase",
    "unstructured",
    "weaviate",
];

pub const VERSIONS_CONFIG: &str = "scripts/docker/stackai-versions.json";
pub const KONG_CONFIG: &str = "supabase/volumes/api/kong.yml";
pub const LLM_LOCAL_CONFIG: &str = "stackend/llm_local_config.toml";

pub fn env_path(root: &Path, service: &str) -> PathBuf {
    root.join(service).join(".env")
}

pub fn versions_config_path(root: &Path) -> PathBuf {
    root.join(VERSIONS_CONFIG)
}

pub fn kong_config_path(root: &Path) -> PathBuf {
    root.join(KONG_CONFIG)
}

pub fn llm_local_config_path(root: &Path) -> PathBuf {
    root.join(LLM_LOCAL_CONFIG)
}

/// Whether `path` looks like an installation root.
pub fn is_install_root(path: &Path) -> bool {
    path.join("docker-compose.yml").is_file()
        && path.join("stackend").is_dir()
        && path.join("stackweb").is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn env_path_joins_service_dir() {
        let root = Path::new("/opt/stackai");
        assert_eq!(
            env_path(root, "supabase"),
            PathBuf::from("/opt/stackai/supabase/.env")
        );
    }

    #[test]
    fn install_root_requires_markers() {
        let dir = TempDir::new().unwrap();
        assert!(!is_install_root(dir.path()));
        std::fs::write(dir.path().join("docker-compose.yml"), "services:\n").unwrap();
        std::fs::create_dir(dir.path().join("stackend")).unwrap();
        assert!(!is_install_root(dir.path()));
        std::fs::create_dir(dir.path().join("stackweb")).unwrap();
        assert!(is_install_root(dir.path()));
    }
}
