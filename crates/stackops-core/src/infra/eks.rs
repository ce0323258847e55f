//! EKS cluster layer: control plane, node groups, add-ons and the IRSA
//! service accounts the Supabase workloads run as.

use super::base::BaseInfrastructure;
use super::managed::ManagedServices;
use super::InfraConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityType {
    OnDemand,
    Spot,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeGroup {
    pub name: String,
    pub instance_types: Vec<String>,
    pub capacity_type: CapacityType,
    pub min_size: u32,
    pub desired_size: u32,
    pub max_size: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceAccount {
    pub name: String,
    pub namespace: String,
    /// Secrets Manager entries the account may read via IRSA.
    pub readable_secrets: Vec<String>,
    /// Bucket the account may read and write, if any.
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EksCluster {
    pub name: String,
    pub version: String,
    pub endpoint: String,
    pub cluster_security_group: String,
    pub nodes_security_group: String,
    pub subnets: Vec<String>,
    pub node_groups: Vec<NodeGroup>,
    pub addons: Vec<String>,
    pub service_accounts: Vec<ServiceAccount>,
}

impl EksCluster {
    pub fn new(
        config: &InfraConfig,
        base: &BaseInfrastructure,
        managed: &ManagedServices,
    ) -> Self {
        let name = config.resource_name("eks");
        let endpoint = format!("https://{name}.eks.{}.amazonaws.com", config.region);
        Self {
            endpoint,
            version: "1.29".to_string(),
            cluster_security_group: base.eks_cluster_sg.name.clone(),
            nodes_security_group: base.eks_nodes_sg.name.clone(),
            subnets: base
                .private_subnets()
                .iter()
                .map(|s| s.name.clone())
                .collect(),
            node_groups: vec![
                NodeGroup {
                    name: format!("{name}-primary"),
                    instance_types: vec!["m5.xlarge".to_string()],
                    capacity_type: CapacityType::OnDemand,
                    min_size: 2,
                    desired_size: 2,
                    max_size: 6,
                },
                NodeGroup {
                    name: format!("{name}-spot"),
                    instance_types: vec!["m5.large".to_string(), "m5a.large".to_string()],
                    capacity_type: CapacityType::Spot,
                    min_size: 0,
                    desired_size: 1,
                    max_size: 4,
                },
            ],
            addons: vec![
                "vpc-cni".to_string(),
                "coredns".to_string(),
                "kube-proxy".to_string(),
                "aws-ebs-csi-driver".to_string(),
                "aws-load-balancer-controller".to_string(),
                "cluster-autoscaler".to_string(),
            ],
            service_accounts: vec![
                ServiceAccount {
                    name: "gotrue".to_string(),
                    namespace: "supabase".to_string(),
                    readable_secrets: vec![managed.aurora.secret_name.clone()],
                    bucket: None,
                },
                ServiceAccount {
                    name: "storage".to_string(),
                    namespace: "supabase".to_string(),
                    readable_secrets: vec![managed.aurora.secret_name.clone()],
                    bucket: Some(managed.storage_bucket.name.clone()),
                },
                ServiceAccount {
                    name: "external-secrets".to_string(),
                    namespace: "supabase".to_string(),
                    readable_secrets: vec![
                        managed.aurora.secret_name.clone(),
                        managed.docdb.secret_name.clone(),
                    ],
                    bucket: None,
                },
            ],
            name,
        }
    }

    /// The command an operator runs to point kubectl at this cluster.
    pub fn kubeconfig_command(&self, region: &str) -> String {
        format!(
            "aws eks update-kubeconfig --region {region} --name {}",
            self.name
        )
    }
}
