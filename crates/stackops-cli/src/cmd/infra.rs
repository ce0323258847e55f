use crate::output::{print_json, print_table};
use clap::{Args, Subcommand, ValueEnum};
use stackops_core::infra::{InfraConfig, StackBlueprint};

#[derive(Args)]
pub struct InfraArgs {
    /// Project slug used in every resource name
    #[arg(long, default_value = "stackai")]
    project: String,

    /// Deployment environment (production, staging, ...)
    #[arg(long, default_value = "production")]
    environment: String,

    /// AWS region
    #[arg(long)]
    region: String,

    /// 12-digit AWS account id
    #[arg(long)]
    account: String,

    /// Availability zones to span
    #[arg(long, default_value = "2")]
    az_count: u8,

    /// NAT gateways (at most one per zone)
    #[arg(long, default_value = "1")]
    nat_gateways: u8,
}

impl InfraArgs {
    fn blueprint(&self) -> anyhow::Result<StackBlueprint> {
        let mut config =
            InfraConfig::production(&self.project, &self.region, &self.account);
        config.environment = self.environment.clone();
        config.az_count = self.az_count;
        config.nat_gateways = self.nat_gateways;
        config
            .tags
            .insert("Environment".to_string(), self.environment.clone());
        Ok(StackBlueprint::new(config)?)
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SynthFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
pub enum InfraSubcommand {
    /// Render the full blueprint as a declarative document
    Synth {
        #[command(flatten)]
        args: InfraArgs,

        #[arg(long, value_enum, default_value = "yaml")]
        format: SynthFormat,
    },

    /// Show the operator-facing outputs (endpoints, bucket, kubeconfig command)
    Outputs {
        #[command(flatten)]
        args: InfraArgs,
    },
}

pub fn run(subcommand: InfraSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        InfraSubcommand::Synth { args, format } => {
            let blueprint = args.blueprint()?;
            let rendered = match format {
                SynthFormat::Yaml => blueprint.synth_yaml()?,
                SynthFormat::Json => blueprint.synth_json()?,
            };
            println!("{rendered}");
            Ok(())
        }

        InfraSubcommand::Outputs { args } => {
            let blueprint = args.blueprint()?;
            let outputs = blueprint.outputs();
            if json {
                print_json(&outputs)?;
            } else {
                print_table(
                    &["OUTPUT", "VALUE"],
                    outputs
                        .iter()
                        .map(|o| vec![o.key.clone(), o.value.clone()])
                        .collect(),
                );
            }
            Ok(())
        }
    }
}
