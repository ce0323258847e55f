//! Networking layer: VPC, subnets and security groups.

use super::InfraConfig;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Vpc {
    pub name: String,
    pub cidr: String,
    pub max_azs: u8,
    pub nat_gateways: u8,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subnet {
    pub name: String,
    pub kind: SubnetKind,
    pub availability_zone: String,
    pub cidr_mask: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetKind {
    Public,
    PrivateWithEgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngressRule {
    pub peer: String,
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityGroup {
    pub name: String,
    pub description: String,
    pub allow_all_outbound: bool,
    pub ingress: Vec<IngressRule>,
}

impl SecurityGroup {
    fn new(name: String, description: &str, allow_all_outbound: bool) -> Self {
        Self {
            name,
            description: description.to_string(),
            allow_all_outbound,
            ingress: Vec::new(),
        }
    }

    fn allow_tcp(&mut self, peer: &str, from: u16, to: u16, description: &str) {
        self.ingress.push(IngressRule {
            peer: peer.to_string(),
            protocol: "tcp".to_string(),
            from_port: from,
            to_port: to,
            description: description.to_string(),
        });
    }
}

/// Foundational networking: one VPC spanning `az_count` zones with a public
/// and a private subnet per zone, plus the per-tier security groups every
/// later layer attaches to.
#[derive(Debug, Clone, Serialize)]
pub struct BaseInfrastructure {
    pub vpc: Vpc,
    pub subnets: Vec<Subnet>,
    pub eks_cluster_sg: SecurityGroup,
    pub eks_nodes_sg: SecurityGroup,
    pub rds_sg: SecurityGroup,
    pub docdb_sg: SecurityGroup,
    pub redis_sg: SecurityGroup,
    pub alb_sg: SecurityGroup,
}

impl BaseInfrastructure {
    pub fn new(config: &InfraConfig) -> Self {
        let vpc = Vpc {
            name: config.resource_name("vpc"),
            cidr: "10.0.0.0/16".to_string(),
            max_azs: config.az_count,
            nat_gateways: config.nat_gateways,
            enable_dns_hostnames: true,
            enable_dns_support: true,
        };

        let mut subnets = Vec::new();
        for (i, az) in config.availability_zones().iter().enumerate() {
            subnets.push(Subnet {
                name: format!("{}-public-{}", vpc.name, i + 1),
                kind: SubnetKind::Public,
                availability_zone: az.clone(),
                cidr_mask: 24,
            });
            subnets.push(Subnet {
                name: format!("{}-private-{}", vpc.name, i + 1),
                kind: SubnetKind::PrivateWithEgress,
                availability_zone: az.clone(),
                cidr_mask: 24,
            });
        }

        let mut eks_cluster_sg = SecurityGroup::new(
            config.resource_name("eks-cluster-sg"),
            "EKS control plane",
            true,
        );
        let mut eks_nodes_sg = SecurityGroup::new(
            config.resource_name("eks-nodes-sg"),
            "EKS worker nodes",
            true,
        );
        eks_cluster_sg.allow_tcp(
            &eks_nodes_sg.name,
            443,
            443,
            "nodes to cluster API server",
        );
        eks_nodes_sg.allow_tcp(
            &eks_cluster_sg.name,
            1025,
            65535,
            "cluster to node kubelets",
        );
        let nodes_name = eks_nodes_sg.name.clone();
        eks_nodes_sg.allow_tcp(&nodes_name, 0, 65535, "node to node");

        let mut rds_sg = SecurityGroup::new(
            config.resource_name("rds-sg"),
            "Aurora PostgreSQL",
            false,
        );
        rds_sg.allow_tcp(&eks_nodes_sg.name, 5432, 5432, "nodes to PostgreSQL");

        let mut docdb_sg =
            SecurityGroup::new(config.resource_name("docdb-sg"), "DocumentDB", false);
        docdb_sg.allow_tcp(&eks_nodes_sg.name, 27017, 27017, "nodes to DocumentDB");

        let mut redis_sg =
            SecurityGroup::new(config.resource_name("redis-sg"), "ElastiCache Redis", false);
        redis_sg.allow_tcp(&eks_nodes_sg.name, 6379, 6379, "nodes to Redis");

        let mut alb_sg = SecurityGroup::new(
            config.resource_name("alb-sg"),
            "Application Load Balancer",
            true,
        );
        alb_sg.allow_tcp("0.0.0.0/0", 80, 80, "HTTP from internet");
        alb_sg.allow_tcp("0.0.0.0/0", 443, 443, "HTTPS from internet");
        eks_nodes_sg.allow_tcp(&alb_sg.name, 30000, 32767, "ALB to NodePort services");

        Self {
            vpc,
            subnets,
            eks_cluster_sg,
            eks_nodes_sg,
            rds_sg,
            docdb_sg,
            redis_sg,
            alb_sg,
        }
    }

    pub fn private_subnets(&self) -> Vec<&Subnet> {
        self.subnets
            .iter()
            .filter(|s| s.kind == SubnetKind::PrivateWithEgress)
            .collect()
    }

    pub fn public_subnets(&self) -> Vec<&Subnet> {
        self.subnets
            .iter()
            .filter(|s| s.kind == SubnetKind::Public)
            .collect()
    }
}
