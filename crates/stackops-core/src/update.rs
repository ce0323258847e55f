//! In-place updates of an existing installation.
//!
//! An update has three parts, each usable on its own:
//! release sync (download or take a release zip, extract, copy into the
//! install root while preserving operator-owned files), a checked step runner
//! for the docker compose / migration sequence, and the one-off
//! `llm_local_config.toml` migration.

use crate::error::{OpsError, Result};
use crate::io;
use crate::paths;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

pub const RELEASE_ZIP_URL: &str =
    "https://github.com/stackai/stackai-onprem/archive/refs/heads/main.zip";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Paths matching any of these (by component name, or by `*.ext` suffix) are
/// never copied into the install root.
const EXCLUDE_PATTERNS: &[&str] = &[
    ".git",
    ".github",
    ".idea",
    ".vscode",
    "__pycache__",
    "*.pyc",
    "*.pyo",
    ".DS_Store",
    "node_modules",
    ".venv",
    "*.log",
    "build",
    "dist",
    "*.egg-info",
    "updates",
    "*.tmp",
    "*.bak",
    "*.swp",
];

// ---------------------------------------------------------------------------
// Release sync
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ReleaseSource {
    /// Download the release archive from a URL.
    Remote(String),
    /// Use a zip already on disk.
    LocalZip(PathBuf),
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub copied: usize,
    pub skipped: usize,
}

pub fn download_archive(url: &str, dest: &Path) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()?;
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(OpsError::Api {
            status: status.as_u16(),
            body: format!("downloading {url}"),
        });
    }
    let bytes = response.bytes()?;
    let mut file = std::fs::File::create(dest)?;
    file.write_all(&bytes)?;
    Ok(())
}

pub fn extract_archive(zip_path: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(zip_path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(dest)?;
    Ok(())
}

/// GitHub archives extract to a single `<repo>-<branch>/` directory; that
/// directory is the content root. Anything else is an unknown layout.
pub fn find_content_root(extract_dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(extract_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    if dirs.len() != 1 {
        return Err(OpsError::ArchiveLayoutUnknown);
    }
    Ok(dirs.remove(0))
}

fn is_excluded(relative: &Path) -> bool {
    for component in relative.components() {
        let name = component.as_os_str().to_string_lossy();
        for pattern in EXCLUDE_PATTERNS {
            if let Some(suffix) = pattern.strip_prefix('*') {
                if name.ends_with(suffix) {
                    return true;
                }
            } else if name == *pattern {
                return true;
            }
        }
    }
    false
}

/// `.env` directly under a known service directory at the tree root.
fn is_service_env(relative: &Path) -> bool {
    let mut components = relative.components();
    let (Some(dir), Some(name), None) = (
        components.next(),
        components.next(),
        components.next(),
    ) else {
        return false;
    };
    name.as_os_str() == ".env"
        && paths::SERVICE_DIRS
            .iter()
            .any(|s| dir.as_os_str() == *s)
}

fn sync_dir(
    source_root: &Path,
    current: &Path,
    dest_root: &Path,
    report: &mut SyncReport,
) -> Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let relative = path
            .strip_prefix(source_root)
            .expect("entry is under source root")
            .to_path_buf();

        if is_excluded(&relative) {
            report.skipped += 1;
            continue;
        }

        if entry.file_type()?.is_dir() {
            std::fs::create_dir_all(dest_root.join(&relative))?;
            sync_dir(source_root, &path, dest_root, report)?;
            continue;
        }

        let dest = dest_root.join(&relative);

        // Never clobber an operator's service .env, and skip the example
        // when a real .env already exists next to it.
        if is_service_env(&relative) && dest.exists() {
            report.skipped += 1;
            continue;
        }
        if relative
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(".env.example"))
            .unwrap_or(false)
            && dest.with_file_name(".env").exists()
        {
            report.skipped += 1;
            continue;
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&path, &dest)?;
        report.copied += 1;
    }
    Ok(())
}

/// Copy the extracted release into the install root.
pub fn sync_tree(content_root: &Path, install_root: &Path) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    sync_dir(content_root, content_root, install_root, &mut report)?;
    Ok(report)
}

/// Fetch a release (remote or local zip), extract it and sync it into the
/// install root.
pub fn sync_release(install_root: &Path, source: &ReleaseSource) -> Result<SyncReport> {
    let temp = tempfile::tempdir()?;
    let zip_path = match source {
        ReleaseSource::Remote(url) => {
            let zip_path = temp.path().join("release.zip");
            download_archive(url, &zip_path)?;
            zip_path
        }
        ReleaseSource::LocalZip(path) => {
            if !path.is_file() {
                return Err(OpsError::FileNotFound(path.clone()));
            }
            path.clone()
        }
    };
    let extract_dir = temp.path().join("extracted");
    std::fs::create_dir_all(&extract_dir)?;
    extract_archive(&zip_path, &extract_dir)?;
    let content_root = find_content_root(&extract_dir)?;
    sync_tree(&content_root, install_root)
}

// ---------------------------------------------------------------------------
// Step runner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UpdateStep {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl UpdateStep {
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub name: String,
    pub command: String,
    pub succeeded: bool,
}

/// The standard post-sync sequence: stop the app services, rebuild the
/// frontend, pull the backend images, run the postgres migrations, start
/// everything.
pub fn default_update_steps() -> Vec<UpdateStep> {
    vec![
        UpdateStep::new(
            "stop services",
            "docker",
            &["compose", "stop", "stackweb", "stackend", "celery_worker"],
        ),
        UpdateStep::new("build frontend", "docker", &["compose", "build", "stackweb"]),
        UpdateStep::new(
            "pull backend images",
            "docker",
            &["compose", "pull", "stackend", "celery_worker"],
        ),
        UpdateStep::new("start backend", "docker", &["compose", "up", "-d", "stackend"]),
        UpdateStep::new(
            "run postgres migrations",
            "docker",
            &[
                "compose",
                "exec",
                "stackend",
                "bash",
                "-c",
                "cd infra/migrations/postgres && alembic upgrade head",
            ],
        ),
        UpdateStep::new("start all services", "docker", &["compose", "up", "-d"]),
    ]
}

/// Run steps in order from the install root. Every exit status is checked;
/// the first failure aborts the sequence.
pub fn run_steps(install_root: &Path, steps: &[UpdateStep]) -> Result<Vec<StepReport>> {
    let mut reports = Vec::with_capacity(steps.len());
    for step in steps {
        tracing::info!(step = %step.name, "running update step");
        let status = Command::new(&step.program)
            .args(&step.args)
            .current_dir(install_root)
            .status()?;
        let report = StepReport {
            name: step.name.clone(),
            command: format!("{} {}", step.program, step.args.join(" ")),
            succeeded: status.success(),
        };
        if !status.success() {
            reports.push(report);
            return Err(OpsError::StepFailed {
                step: step.name.clone(),
                status: status.to_string(),
            });
        }
        reports.push(report);
    }
    Ok(reports)
}

// ---------------------------------------------------------------------------
// llm_local_config.toml migration
// ---------------------------------------------------------------------------

/// Migrate `stackend/llm_local_config.toml` to the current model schema:
/// under `[llms.providers.Local]` every model entry renames `name` to
/// `model_name` and gains `has_function_calling = false` when absent, and the
/// `default` entry renames `model_name` to `model_id`. Safe to re-run.
pub fn migrate_llm_local_config(root: &Path) -> Result<bool> {
    let path = paths::llm_local_config_path(root);
    if !path.is_file() {
        return Err(OpsError::FileNotFound(path));
    }
    let content = std::fs::read_to_string(&path)?;
    let mut value: toml::Value = content.parse().map_err(|e: toml::de::Error| OpsError::Toml {
        file: path.clone(),
        message: e.to_string(),
    })?;

    let mut changed = false;
    if let Some(local) = value
        .get_mut("llms")
        .and_then(|v| v.get_mut("providers"))
        .and_then(|v| v.get_mut("Local"))
        .and_then(|v| v.as_table_mut())
    {
        for (entry_name, entry) in local.iter_mut() {
            let Some(table) = entry.as_table_mut() else {
                continue;
            };
            if entry_name == "default" {
                if let Some(model_name) = table.remove("model_name") {
                    table.insert("model_id".to_string(), model_name);
                    changed = true;
                }
            } else {
                if let Some(name) = table.remove("name") {
                    table.insert("model_name".to_string(), name);
                    changed = true;
                }
                if !table.contains_key("has_function_calling") {
                    table.insert("has_function_calling".to_string(), toml::Value::Boolean(false));
                    changed = true;
                }
            }
        }
    }

    if changed {
        let rendered = toml::to_string_pretty(&value).map_err(|e| OpsError::Toml {
            file: path.clone(),
            message: e.to_string(),
        })?;
        io::atomic_write(&path, rendered.as_bytes())?;
    }
    Ok(changed)
}
