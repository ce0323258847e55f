use crate::output::{confirm, print_json, print_table};
use crate::root::require_install_root;
use clap::Subcommand;
use stackops_core::saml::{self, SamlAdminClient, SamlProvider};
use std::path::Path;

#[derive(Subcommand)]
pub enum SamlSubcommand {
    /// Register an identity provider
    Add {
        /// IdP metadata URL
        metadata_url: String,

        /// Comma-separated email domains routed to this provider
        #[arg(long)]
        domains: String,
    },

    /// List registered providers
    List,

    /// Show whether SAML is enabled and the endpoint URLs
    Status,

    /// Enable SAML: set the auth env vars and open the Kong SSO routes
    Enable,

    /// Remove a provider by id
    Delete {
        /// Provider UUID
        provider_id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn provider_rows(providers: &[SamlProvider]) -> Vec<Vec<String>> {
    providers
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.domains
                    .iter()
                    .map(|d| d.domain.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                p.saml
                    .as_ref()
                    .and_then(|s| s.metadata_url.clone())
                    .unwrap_or_default(),
            ]
        })
        .collect()
}

pub fn run(root: &Path, subcommand: SamlSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        SamlSubcommand::Add {
            metadata_url,
            domains,
        } => {
            let domains = saml::split_domains(&domains)?;
            let client = SamlAdminClient::from_env(root)?;
            let provider = client.add_provider(&metadata_url, &domains)?;
            if json {
                print_json(&provider)?;
            } else {
                println!("provider {} registered", provider.id);
            }
            Ok(())
        }

        SamlSubcommand::List => {
            let client = SamlAdminClient::from_env(root)?;
            let providers = client.list_providers()?;
            if json {
                print_json(&providers)?;
            } else if providers.is_empty() {
                println!("no providers registered");
            } else {
                print_table(&["ID", "DOMAINS", "METADATA URL"], provider_rows(&providers));
            }
            Ok(())
        }

        SamlSubcommand::Status => {
            let status = saml::saml_status(root)?;
            if json {
                print_json(&status)?;
            } else {
                print_table(
                    &["FIELD", "VALUE"],
                    vec![
                        vec!["enabled".into(), status.enabled.to_string()],
                        vec!["acs_url".into(), status.acs_url],
                        vec!["metadata_url".into(), status.metadata_url],
                    ],
                );
            }
            Ok(())
        }

        SamlSubcommand::Enable => {
            require_install_root(root)?;
            let report = saml::enable_saml(root, None)?;
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "SAML enabled (kong routes {})",
                    if report.kong_updated {
                        "added"
                    } else {
                        "already present"
                    }
                );
                println!("restart the supabase services to apply the change");
            }
            Ok(())
        }

        SamlSubcommand::Delete { provider_id, yes } => {
            let id = saml::validate_provider_id(&provider_id)?;
            if !confirm(&format!("Delete provider {id}?"), yes)? {
                println!("aborted");
                return Ok(());
            }
            let client = SamlAdminClient::from_env(root)?;
            client.delete_provider(&id)?;
            if !json {
                println!("provider {id} deleted");
            }
            Ok(())
        }
    }
}
