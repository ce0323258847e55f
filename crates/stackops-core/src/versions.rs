//! Docker image version bumping driven by `scripts/docker/stackai-versions.json`.
//!
//! The config is a list of single-key objects, each mapping a release name to
//! a table of per-service image tags:
//!
//! ```json
//! [
//!   { "v1.2.0": { "stackend": "1.2.0", "stackweb": "1.2.0", "stackrepl": "0.9.1" } }
//! ]
//! ```
//!
//! Bumping rewrites the image references in place with a regex, so every
//! other line of the target files stays byte-identical.

use crate::error::{OpsError, Result};
use crate::io;
use crate::paths;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

type VersionTable = BTreeMap<String, BTreeMap<String, String>>;

/// One image rewrite rule: which file to edit and how to match the image line.
struct ImageRule {
    service: &'static str,
    file: &'static str,
    pattern: &'static str,
    image: &'static str,
}

const IMAGE_RULES: &[ImageRule] = &[
    ImageRule {
        service: "stackend",
        file: "stackend/docker-compose.yml",
        pattern: r"image: stackai\.azurecr\.io/stackai/stackend-backend:[^\s]+",
        image: "image: stackai.azurecr.io/stackai/stackend-backend",
    },
    ImageRule {
        service: "stackend",
        file: "stackend/docker-compose.yml",
        pattern: r"image: stackai\.azurecr\.io/stackai/stackend-celery-worker:[^\s]+",
        image: "image: stackai.azurecr.io/stackai/stackend-celery-worker",
    },
    ImageRule {
        service: "stackweb",
        file: "stackweb/Dockerfile",
        pattern: r"FROM stackai\.azurecr\.io/stackai/stackweb:[^\s]+",
        image: "FROM stackai.azurecr.io/stackai/stackweb",
    },
    ImageRule {
        service: "stackrepl",
        file: "stackrepl/docker-compose.yml",
        pattern: r"image: stackai\.azurecr\.io/stackai/stackrepl/stack-repl:[^\s]+",
        image: "image: stackai.azurecr.io/stackai/stackrepl/stack-repl",
    },
];

#[derive(Debug)]
pub struct VersionsConfig {
    releases: Vec<VersionTable>,
}

impl VersionsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(OpsError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let releases: Vec<VersionTable> = serde_json::from_str(&content)?;
        Ok(Self { releases })
    }

    pub fn load_from_root(root: &Path) -> Result<Self> {
        Self::load(&paths::versions_config_path(root))
    }

    /// Release names in config order.
    pub fn available(&self) -> Vec<String> {
        self.releases
            .iter()
            .flat_map(|entry| entry.keys().cloned())
            .collect()
    }

    /// Per-service tags for one release.
    pub fn resolve(&self, version: &str) -> Result<&BTreeMap<String, String>> {
        self.releases
            .iter()
            .find_map(|entry| entry.get(version))
            .ok_or_else(|| {
                OpsError::UnknownVersion(version.to_string(), self.available().join(", "))
            })
    }
}

#[derive(Debug, Serialize)]
pub struct BumpReport {
    pub service: String,
    pub file: PathBuf,
    pub tag: String,
    pub replacements: usize,
}

/// Rewrite every image reference for `version` across the install root.
/// Services present in the release table but missing their target file fail
/// the run; untouched files are reported with zero replacements.
pub fn bump(root: &Path, config: &VersionsConfig, version: &str) -> Result<Vec<BumpReport>> {
    let tags = config.resolve(version)?;
    let mut reports = Vec::new();
    for rule in IMAGE_RULES {
        let Some(tag) = tags.get(rule.service) else {
            continue;
        };
        let path = root.join(rule.file);
        if !path.is_file() {
            return Err(OpsError::FileNotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let re = Regex::new(rule.pattern).expect("image pattern is valid");
        let replacement = format!("{}:{}", rule.image, tag);
        let replacements = re.find_iter(&content).count();
        if replacements > 0 {
            let updated = re.replace_all(&content, replacement.as_str());
            io::atomic_write(&path, updated.as_bytes())?;
        }
        reports.push(BumpReport {
            service: rule.service.to_string(),
            file: path,
            tag: tag.clone(),
            replacements,
        });
    }
    Ok(reports)
}
