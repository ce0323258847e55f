use crate::output::{confirm, print_json, print_table};
use crate::root::require_install_root;
use clap::Subcommand;
use stackops_core::credentials::{self, BootstrapOptions};
use stackops_core::envfile::{self, EnvUpdate};
use stackops_core::paths;
use stackops_core::urls::{self, UrlUpdates};
use stackops_core::OpsError;
use std::path::Path;

#[derive(Subcommand)]
pub enum EnvSubcommand {
    /// Create the per-service .env files, generating shared credentials
    Init {
        /// Hostname or IP the installation is reachable at
        #[arg(long)]
        host: String,

        /// StackAI licence key
        #[arg(long)]
        licence: String,
    },

    /// Set a variable in a service's .env
    Set {
        /// Service directory (stackend, stackweb, supabase, ...)
        service: String,
        key: String,
        value: String,
    },

    /// Read a variable from a service's .env
    Get { service: String, key: String },

    /// Show the externally visible URLs, or rewrite them across services
    Urls {
        /// Frontend URL (e.g. https://stackai.example.com)
        #[arg(long)]
        app_url: Option<String>,

        /// Backend API URL
        #[arg(long)]
        api_url: Option<String>,

        /// Supabase URL
        #[arg(long)]
        supabase_url: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(root: &Path, subcommand: EnvSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        EnvSubcommand::Init { host, licence } => {
            require_install_root(root)?;
            let reports = credentials::bootstrap(root, &BootstrapOptions { host, licence })?;
            if json {
                print_json(&reports)?;
            } else {
                print_table(
                    &["SERVICE", "ENV FILE", "STATUS"],
                    reports
                        .iter()
                        .map(|r| {
                            vec![
                                r.service.clone(),
                                r.path.display().to_string(),
                                if r.created { "created" } else { "updated" }.to_string(),
                            ]
                        })
                        .collect(),
                );
            }
            Ok(())
        }

        EnvSubcommand::Set {
            service,
            key,
            value,
        } => {
            let path = paths::env_path(root, &service);
            envfile::update_env_file(&path, &[EnvUpdate::value(&key, &value)])?;
            if !json {
                println!("{service}/.env: {key} set");
            }
            Ok(())
        }

        EnvSubcommand::Get { service, key } => {
            let path = paths::env_path(root, &service);
            let value = envfile::read_env_var(&path, &key)?
                .ok_or_else(|| OpsError::EnvKeyNotFound(key.clone()))?;
            if json {
                print_json(&serde_json::json!({ "service": service, "key": key, "value": value }))?;
            } else {
                println!("{value}");
            }
            Ok(())
        }

        EnvSubcommand::Urls {
            app_url,
            api_url,
            supabase_url,
            yes,
        } => {
            require_install_root(root)?;
            let updates = UrlUpdates {
                app_url,
                api_url,
                supabase_url,
            };
            if updates.is_empty() {
                let current = urls::current_urls(root)?;
                if json {
                    print_json(&current)?;
                } else {
                    print_table(
                        &["URL", "VALUE"],
                        vec![
                            vec!["app".into(), current.app_url.unwrap_or_default()],
                            vec!["api".into(), current.api_url.unwrap_or_default()],
                            vec![
                                "supabase".into(),
                                current.supabase_url.unwrap_or_default(),
                            ],
                        ],
                    );
                }
                return Ok(());
            }

            urls::check_env_files(root)?;
            let plan = updates.plan(root);
            if !confirm(
                &format!("Rewrite URLs in {} env files?", plan.len()),
                yes,
            )? {
                println!("aborted");
                return Ok(());
            }
            for (path, file_updates) in &plan {
                envfile::update_env_file(path, file_updates)?;
                if !json {
                    println!("updated {}", path.display());
                }
            }
            if json {
                print_json(&serde_json::json!({ "files_updated": plan.len() }))?;
            }
            Ok(())
        }
    }
}
