//! URL reconciliation across the stackend / stackweb / supabase env files.
//!
//! Operators move installations between hosts; the public app, API, and
//! Supabase URLs are each fanned out to several keys across three files.

use crate::envfile::{read_env_var, EnvUpdate};
use crate::error::{OpsError, Result};
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const URL_SERVICES: &[&str] = &["stackend", "stackweb", "supabase"];

/// Requested URL changes. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct UrlUpdates {
    pub app_url: Option<String>,
    pub api_url: Option<String>,
    pub supabase_url: Option<String>,
}

impl UrlUpdates {
    pub fn is_empty(&self) -> bool {
        self.app_url.is_none() && self.api_url.is_none() && self.supabase_url.is_none()
    }

    /// Per-file updates implementing the fan-out. Files with no affected
    /// keys are omitted.
    pub fn plan(&self, root: &Path) -> Vec<(PathBuf, Vec<EnvUpdate>)> {
        let mut plan = Vec::new();

        let mut stackend = Vec::new();
        if let Some(app) = &self.app_url {
            stackend.push(EnvUpdate::value("STACKWEB_URL", app));
        }
        if let Some(api) = &self.api_url {
            stackend.push(EnvUpdate::value("STACKEND_API_URL", api));
            stackend.push(EnvUpdate::value("INDEXING_API_URL", api));
        }
        if !stackend.is_empty() {
            plan.push((paths::env_path(root, "stackend"), stackend));
        }

        let mut stackweb = Vec::new();
        if let Some(app) = &self.app_url {
            stackweb.push(EnvUpdate::value("NEXT_PUBLIC_URL", app));
            stackweb.push(EnvUpdate::value("NEXT_PUBLIC_SITE_URL", app));
        }
        if let Some(api) = &self.api_url {
            stackweb.push(EnvUpdate::value("NEXT_PUBLIC_INDEX_URL", api));
            stackweb.push(EnvUpdate::value("NEXT_PUBLIC_CHAT_BACKEND_URL", api));
            stackweb.push(EnvUpdate::value("NEXT_PUBLIC_STACKEND_URL", api));
            stackweb.push(EnvUpdate::value("NEXT_PUBLIC_STACKEND_INFERENCE_URL", api));
        }
        if let Some(supabase) = &self.supabase_url {
            stackweb.push(EnvUpdate::value("NEXT_PUBLIC_SUPABASE_URL", supabase));
        }
        if !stackweb.is_empty() {
            plan.push((paths::env_path(root, "stackweb"), stackweb));
        }

        let mut supabase = Vec::new();
        if let Some(app) = &self.app_url {
            supabase.push(EnvUpdate::value("SITE_URL", app));
        }
        if let Some(url) = &self.supabase_url {
            supabase.push(EnvUpdate::value("API_EXTERNAL_URL", url));
            supabase.push(EnvUpdate::value("SUPABASE_PUBLIC_URL", url));
        }
        if !supabase.is_empty() {
            plan.push((paths::env_path(root, "supabase"), supabase));
        }

        plan
    }
}

/// Current values as seen across the env files, first match wins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CurrentUrls {
    pub app_url: Option<String>,
    pub api_url: Option<String>,
    pub supabase_url: Option<String>,
}

pub fn current_urls(root: &Path) -> Result<CurrentUrls> {
    let stackend = paths::env_path(root, "stackend");
    let stackweb = paths::env_path(root, "stackweb");
    let supabase = paths::env_path(root, "supabase");

    let app_url = first_of(&[
        (&stackend, "STACKWEB_URL"),
        (&stackweb, "NEXT_PUBLIC_URL"),
        (&supabase, "SITE_URL"),
    ])?;
    let api_url = first_of(&[
        (&stackend, "STACKEND_API_URL"),
        (&stackweb, "NEXT_PUBLIC_STACKEND_URL"),
    ])?;
    let supabase_url = first_of(&[
        (&stackweb, "NEXT_PUBLIC_SUPABASE_URL"),
        (&supabase, "API_EXTERNAL_URL"),
    ])?;

    Ok(CurrentUrls {
        app_url,
        api_url,
        supabase_url,
    })
}

/// All three env files must exist before URLs can be reconciled.
pub fn check_env_files(root: &Path) -> Result<()> {
    for service in URL_SERVICES {
        let path = paths::env_path(root, service);
        if !path.is_file() {
            return Err(OpsError::EnvFileNotFound(path));
        }
    }
    Ok(())
}

fn first_of(candidates: &[(&PathBuf, &str)]) -> Result<Option<String>> {
    for (path, key) in candidates {
        if let Some(value) = read_env_var(path, key)? {
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envfile::update_env_file;
    use tempfile::TempDir;

    fn seed(dir: &TempDir) {
        for service in URL_SERVICES {
            std::fs::create_dir_all(dir.path().join(service)).unwrap();
        }
        std::fs::write(
            dir.path().join("stackend/.env"),
            "STACKWEB_URL=https://old.example.com\nSTACKEND_API_URL=https://api.old.example.com\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("stackweb/.env"),
            "NEXT_PUBLIC_SUPABASE_URL=https://supabase.old.example.com\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("supabase/.env"), "SITE_URL=ignored\n").unwrap();
    }

    #[test]
    fn current_urls_prefers_first_source() {
        let dir = TempDir::new().unwrap();
        seed(&dir);
        let current = current_urls(dir.path()).unwrap();
        assert_eq!(current.app_url.as_deref(), Some("https://old.example.com"));
        assert_eq!(
            current.api_url.as_deref(),
            Some("https://api.old.example.com")
        );
        assert_eq!(
            current.supabase_url.as_deref(),
            Some("https://supabase.old.example.com")
        );
    }

    #[test]
    fn plan_only_touches_affected_files() {
        let dir = TempDir::new().unwrap();
        let updates = UrlUpdates {
            app_url: None,
            api_url: Some("https://api.new.example.com".into()),
            supabase_url: None,
        };
        let plan = updates.plan(dir.path());
        let files: Vec<_> = plan.iter().map(|(p, _)| p.clone()).collect();
        assert!(files.contains(&dir.path().join("stackend/.env")));
        assert!(files.contains(&dir.path().join("stackweb/.env")));
        assert!(!files.contains(&dir.path().join("supabase/.env")));
    }

    #[test]
    fn applying_the_plan_updates_all_fanned_out_keys() {
        let dir = TempDir::new().unwrap();
        seed(&dir);
        let updates = UrlUpdates {
            app_url: Some("https://app.new.example.com".into()),
            api_url: None,
            supabase_url: None,
        };
        for (path, file_updates) in updates.plan(dir.path()) {
            update_env_file(&path, &file_updates).unwrap();
        }
        assert_eq!(
            read_env_var(&dir.path().join("stackend/.env"), "STACKWEB_URL")
                .unwrap()
                .as_deref(),
            Some("https://app.new.example.com")
        );
        assert_eq!(
            read_env_var(&dir.path().join("supabase/.env"), "SITE_URL")
                .unwrap()
                .as_deref(),
            Some("https://app.new.example.com")
        );
    }

    #[test]
    fn check_env_files_reports_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            check_env_files(dir.path()),
            Err(OpsError::EnvFileNotFound(_))
        ));
    }
}
