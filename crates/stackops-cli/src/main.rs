mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    env::EnvSubcommand, infra::InfraSubcommand, saml::SamlSubcommand,
    templates::TemplatesSubcommand, update::UpdateSubcommand, versions::VersionsSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stackops",
    about = "Operations toolkit for StackAI on-premise installations",
    version,
    propagate_version = true
)]
struct Cli {
    /// Installation root (default: walk up from cwd looking for docker-compose.yml)
    #[arg(long, global = true, env = "STACKOPS_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage per-service .env files
    Env {
        #[command(subcommand)]
        subcommand: EnvSubcommand,
    },

    /// Manage SAML identity providers
    Saml {
        #[command(subcommand)]
        subcommand: SamlSubcommand,
    },

    /// Migrate MongoDB flow templates
    Templates {
        #[command(subcommand)]
        subcommand: TemplatesSubcommand,
    },

    /// Bump docker image versions
    Versions {
        #[command(subcommand)]
        subcommand: VersionsSubcommand,
    },

    /// Update the installation in place
    Update {
        #[command(subcommand)]
        subcommand: UpdateSubcommand,
    },

    /// Model the AWS deployment blueprint
    Infra {
        #[command(subcommand)]
        subcommand: InfraSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Env { subcommand } => cmd::env::run(&root, subcommand, cli.json),
        Commands::Saml { subcommand } => cmd::saml::run(&root, subcommand, cli.json),
        Commands::Templates { subcommand } => cmd::templates::run(&root, subcommand, cli.json),
        Commands::Versions { subcommand } => cmd::versions::run(&root, subcommand, cli.json),
        Commands::Update { subcommand } => cmd::update::run(&root, subcommand, cli.json),
        Commands::Infra { subcommand } => cmd::infra::run(subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
