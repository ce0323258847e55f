use crate::output::{confirm, print_json, print_table};
use crate::root::require_install_root;
use clap::Subcommand;
use stackops_core::update::{self, ReleaseSource};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum UpdateSubcommand {
    /// Sync a release into the installation and run the update steps
    Run {
        /// Release archive URL (default: the main-branch archive)
        #[arg(long)]
        url: Option<String>,

        /// Use a release zip already on disk instead of downloading
        #[arg(long, conflicts_with = "url")]
        zip: Option<PathBuf>,

        /// Only sync files, skip the docker compose / migration steps
        #[arg(long)]
        sync_only: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Migrate stackend/llm_local_config.toml to the current model schema
    LlmConfig,
}

pub fn run(root: &Path, subcommand: UpdateSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        UpdateSubcommand::Run {
            url,
            zip,
            sync_only,
            yes,
        } => {
            require_install_root(root)?;
            let source = match zip {
                Some(path) => ReleaseSource::LocalZip(path),
                None => ReleaseSource::Remote(
                    url.unwrap_or_else(|| update::RELEASE_ZIP_URL.to_string()),
                ),
            };
            if !confirm(
                &format!("Update the installation at {}?", root.display()),
                yes,
            )? {
                println!("aborted");
                return Ok(());
            }

            let sync = update::sync_release(root, &source)?;
            if !json {
                println!(
                    "sync: {} files copied, {} skipped/preserved",
                    sync.copied, sync.skipped
                );
            }

            if sync_only {
                if json {
                    print_json(&sync)?;
                }
                return Ok(());
            }

            let steps = update::run_steps(root, &update::default_update_steps())?;
            if json {
                print_json(&serde_json::json!({ "sync": sync, "steps": steps }))?;
            } else {
                print_table(
                    &["STEP", "COMMAND", "RESULT"],
                    steps
                        .iter()
                        .map(|s| {
                            vec![
                                s.name.clone(),
                                s.command.clone(),
                                if s.succeeded { "ok" } else { "failed" }.to_string(),
                            ]
                        })
                        .collect(),
                );
            }
            Ok(())
        }

        UpdateSubcommand::LlmConfig => {
            let changed = update::migrate_llm_local_config(root)?;
            if json {
                print_json(&serde_json::json!({ "changed": changed }))?;
            } else if changed {
                println!("llm_local_config.toml migrated");
            } else {
                println!("llm_local_config.toml already up to date");
            }
            Ok(())
        }
    }
}
