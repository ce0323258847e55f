//! Declarative model of the AWS deployment for a hosted StackAI stack.
//!
//! Four layers form a strict chain, each constructed from an explicit config
//! plus references to the layers before it:
//!
//! `BaseInfrastructure` (VPC, subnets, security groups) →
//! `ManagedServices` (Aurora, DocumentDB, Redis, S3) →
//! `EksCluster` (control plane, node groups, IRSA accounts) →
//! `SupabaseServices` (workloads, edge API).
//!
//! Construction performs no I/O: `StackBlueprint::synth` renders the whole
//! chain to a declarative document for the cloud tooling to reconcile, and
//! `outputs` yields the operator-facing values.

pub mod base;
pub mod eks;
pub mod managed;
pub mod supabase;

use crate::error::{OpsError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

pub use base::BaseInfrastructure;
pub use eks::EksCluster;
pub use managed::ManagedServices;
pub use supabase::SupabaseServices;

#[derive(Debug, Clone, Serialize)]
pub struct InfraConfig {
    pub project: String,
    pub environment: String,
    pub region: String,
    pub account: String,
    pub az_count: u8,
    pub nat_gateways: u8,
    pub tags: BTreeMap<String, String>,
}

impl InfraConfig {
    /// Sensible defaults for a production deployment of `project`.
    pub fn production(project: &str, region: &str, account: &str) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("Project".to_string(), "StackAI".to_string());
        tags.insert("Environment".to_string(), "Production".to_string());
        tags.insert("ManagedBy".to_string(), "stackops".to_string());
        Self {
            project: project.to_string(),
            environment: "production".to_string(),
            region: region.to_string(),
            account: account.to_string(),
            az_count: 2,
            nat_gateways: 1,
            tags,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.is_empty() {
            return Err(OpsError::InvalidInfraConfig("project must not be empty".into()));
        }
        if !self
            .project
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(OpsError::InvalidInfraConfig(format!(
                "project '{}' must be lowercase alphanumeric with dashes",
                self.project
            )));
        }
        if self.region.is_empty() {
            return Err(OpsError::InvalidInfraConfig("region must not be empty".into()));
        }
        if self.account.len() != 12 || !self.account.chars().all(|c| c.is_ascii_digit()) {
            return Err(OpsError::InvalidInfraConfig(format!(
                "account '{}' must be a 12-digit AWS account id",
                self.account
            )));
        }
        if !(1..=3).contains(&self.az_count) {
            return Err(OpsError::InvalidInfraConfig(
                "az_count must be between 1 and 3".into(),
            ));
        }
        if self.nat_gateways == 0 || self.nat_gateways > self.az_count {
            return Err(OpsError::InvalidInfraConfig(
                "nat_gateways must be between 1 and az_count".into(),
            ));
        }
        Ok(())
    }

    /// `{project}-{environment}-{suffix}`, the naming scheme for every
    /// resource in the blueprint.
    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-{}-{}", self.project, self.environment, suffix)
    }

    pub fn availability_zones(&self) -> Vec<String> {
        (0..self.az_count)
            .map(|i| format!("{}{}", self.region, (b'a' + i) as char))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InfraOutput {
    pub key: String,
    pub value: String,
    pub description: String,
}

/// The fully wired chain, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct StackBlueprint {
    pub config: InfraConfig,
    pub base: BaseInfrastructure,
    pub managed: ManagedServices,
    pub eks: EksCluster,
    pub supabase: SupabaseServices,
}

impl StackBlueprint {
    pub fn new(config: InfraConfig) -> Result<Self> {
        config.validate()?;
        let base = BaseInfrastructure::new(&config);
        let managed = ManagedServices::new(&config, &base);
        let eks = EksCluster::new(&config, &base, &managed);
        let supabase = SupabaseServices::new(&config, &managed, &eks);
        Ok(Self {
            config,
            base,
            managed,
            eks,
            supabase,
        })
    }

    pub fn synth_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn synth_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Operator-facing outputs, the stack-output analogue.
    pub fn outputs(&self) -> Vec<InfraOutput> {
        vec![
            InfraOutput {
                key: "VpcName".to_string(),
                value: self.base.vpc.name.clone(),
                description: "VPC carrying the whole deployment".to_string(),
            },
            InfraOutput {
                key: "ClusterName".to_string(),
                value: self.eks.name.clone(),
                description: "EKS cluster name".to_string(),
            },
            InfraOutput {
                key: "KubeconfigCommand".to_string(),
                value: self.eks.kubeconfig_command(&self.config.region),
                description: "Point kubectl at the cluster".to_string(),
            },
            InfraOutput {
                key: "AuroraEndpoint".to_string(),
                value: self.managed.aurora.writer_endpoint.clone(),
                description: "Aurora PostgreSQL writer endpoint".to_string(),
            },
            InfraOutput {
                key: "DocDbEndpoint".to_string(),
                value: self.managed.docdb.endpoint.clone(),
                description: "DocumentDB endpoint".to_string(),
            },
            InfraOutput {
                key: "RedisEndpoint".to_string(),
                value: self.managed.redis.endpoint.clone(),
                description: "ElastiCache Redis configuration endpoint".to_string(),
            },
            InfraOutput {
                key: "StorageBucket".to_string(),
                value: self.managed.storage_bucket.name.clone(),
                description: "S3 bucket for Supabase storage".to_string(),
            },
            InfraOutput {
                key: "EdgeFunctionsUrl".to_string(),
                value: self.supabase.edge_api.url.clone(),
                description: "Edge functions API URL".to_string(),
            },
        ]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config() -> InfraConfig {
        InfraConfig::production("stackai", "us-east-1", "123456789012")
    }

    #[test]
    fn validation_rejects_bad_configs() {
        let mut config = test_config();
        config.account = "12345".to_string();
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.project = "Stack AI".to_string();
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.nat_gateways = 3;
        config.az_count = 2;
        assert!(config.validate().is_err());

        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn blueprint_wires_the_full_chain() {
        let blueprint = StackBlueprint::new(test_config()).unwrap();
        assert_eq!(
            blueprint.eks.cluster_security_group,
            blueprint.base.eks_cluster_sg.name
        );
        assert_eq!(
            blueprint.supabase.workloads[0].env[0].1,
            blueprint.managed.aurora.writer_endpoint
        );
    }

    #[test]
    fn synth_renders_parseable_yaml() {
        let blueprint = StackBlueprint::new(test_config()).unwrap();
        let yaml = blueprint.synth_yaml().unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert!(value.get("eks").is_some());
        assert!(value.get("supabase").is_some());
    }

    #[test]
    fn outputs_cover_operator_essentials() {
        let blueprint = StackBlueprint::new(test_config()).unwrap();
        let outputs = blueprint.outputs();
        let keys: Vec<&str> = outputs.iter().map(|o| o.key.as_str()).collect();
        assert!(keys.contains(&"ClusterName"));
        assert!(keys.contains(&"KubeconfigCommand"));
        assert!(keys.contains(&"EdgeFunctionsUrl"));
        let kubeconfig = outputs
            .iter()
            .find(|o| o.key == "KubeconfigCommand")
            .unwrap();
        assert!(kubeconfig.value.contains("us-east-1"));
    }
}
