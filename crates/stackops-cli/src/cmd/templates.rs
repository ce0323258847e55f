use crate::output::{confirm, print_json};
use clap::Subcommand;
use stackops_core::templates;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum TemplatesSubcommand {
    /// Replace this installation's templates with the set from another deployment
    Sync {
        /// Connection string of the deployment to copy from
        #[arg(long)]
        source_uri: String,

        /// Target connection string (default: derived from mongodb/.env)
        #[arg(long)]
        target_uri: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Export templates to a zip archive
    Export {
        /// Where to write the archive
        out: PathBuf,

        /// Source connection string (default: derived from mongodb/.env)
        #[arg(long)]
        uri: Option<String>,
    },

    /// Replace this installation's templates with the set from an archive
    Import {
        /// Archive produced by `templates export`
        archive: PathBuf,

        /// Target connection string (default: derived from mongodb/.env)
        #[arg(long)]
        uri: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn resolve_uri(root: &Path, uri: Option<String>) -> anyhow::Result<String> {
    match uri {
        Some(uri) => Ok(uri),
        None => Ok(templates::mongodb_uri_from_env(root)?),
    }
}

pub fn run(root: &Path, subcommand: TemplatesSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        TemplatesSubcommand::Sync {
            source_uri,
            target_uri,
            yes,
        } => {
            let target_uri = resolve_uri(root, target_uri)?;
            let source = templates::connect(&source_uri)?;
            let docs = templates::fetch_templates(&source)?;
            if !confirm(
                &format!(
                    "Drop the target template collection and install {} templates?",
                    docs.len()
                ),
                yes,
            )? {
                println!("aborted");
                return Ok(());
            }
            let target = templates::connect(&target_uri)?;
            let installed = templates::replace_templates(&target, &docs)?;
            if json {
                print_json(&serde_json::json!({ "installed": installed }))?;
            } else {
                println!("{installed} templates installed");
            }
            Ok(())
        }

        TemplatesSubcommand::Export { out, uri } => {
            let uri = resolve_uri(root, uri)?;
            let client = templates::connect(&uri)?;
            let docs = templates::fetch_templates(&client)?;
            templates::write_archive(&out, &docs)?;
            if json {
                print_json(&serde_json::json!({
                    "archive": out,
                    "templates": docs.len(),
                }))?;
            } else {
                println!("{} templates written to {}", docs.len(), out.display());
            }
            Ok(())
        }

        TemplatesSubcommand::Import { archive, uri, yes } => {
            let uri = resolve_uri(root, uri)?;
            let docs = templates::read_archive(&archive)?;
            if !confirm(
                &format!(
                    "Drop the target template collection and install {} templates?",
                    docs.len()
                ),
                yes,
            )? {
                println!("aborted");
                return Ok(());
            }
            let client = templates::connect(&uri)?;
            let installed = templates::replace_templates(&client, &docs)?;
            if json {
                print_json(&serde_json::json!({ "installed": installed }))?;
            } else {
                println!("{installed} templates installed");
            }
            Ok(())
        }
    }
}
