use crate::output::{print_json, print_table};
use crate::root::require_install_root;
use clap::Subcommand;
use stackops_core::versions::{self, VersionsConfig};
use std::path::Path;

#[derive(Subcommand)]
pub enum VersionsSubcommand {
    /// List the releases known to this installation
    List,

    /// Rewrite the docker image tags for a release
    #[command(disable_version_flag = true)]
    Bump {
        /// Release name from stackai-versions.json (e.g. v1.2.0)
        version: String,
    },
}

pub fn run(root: &Path, subcommand: VersionsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        VersionsSubcommand::List => {
            let config = VersionsConfig::load_from_root(root)?;
            let releases = config.available();
            if json {
                print_json(&releases)?;
                return Ok(());
            }
            let rows = releases
                .iter()
                .map(|release| {
                    let tags = config
                        .resolve(release)
                        .map(|t| {
                            t.iter()
                                .map(|(service, tag)| format!("{service}:{tag}"))
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .unwrap_or_default();
                    vec![release.clone(), tags]
                })
                .collect();
            print_table(&["RELEASE", "IMAGE TAGS"], rows);
            Ok(())
        }

        VersionsSubcommand::Bump { version } => {
            require_install_root(root)?;
            let config = VersionsConfig::load_from_root(root)?;
            let reports = versions::bump(root, &config, &version)?;
            if json {
                print_json(&reports)?;
            } else {
                print_table(
                    &["SERVICE", "FILE", "TAG", "REPLACED"],
                    reports
                        .iter()
                        .map(|r| {
                            vec![
                                r.service.clone(),
                                r.file.display().to_string(),
                                r.tag.clone(),
                                r.replacements.to_string(),
                            ]
                        })
                        .collect(),
                );
            }
            Ok(())
        }
    }
}
