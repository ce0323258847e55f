//! Managed data services: Aurora PostgreSQL, DocumentDB, Redis and the
//! storage bucket. Built on top of [`BaseInfrastructure`].

use super::base::BaseInfrastructure;
use super::InfraConfig;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AuroraCluster {
    pub identifier: String,
    pub engine: String,
    pub writer_endpoint: String,
    pub reader_endpoint: String,
    pub port: u16,
    pub database_name: String,
    pub secret_name: String,
    pub security_group: String,
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocDbCluster {
    pub identifier: String,
    pub endpoint: String,
    pub port: u16,
    pub secret_name: String,
    pub security_group: String,
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedisCluster {
    pub identifier: String,
    pub endpoint: String,
    pub port: u16,
    pub security_group: String,
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageBucket {
    pub name: String,
    pub versioned: bool,
    pub block_public_access: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagedServices {
    pub aurora: AuroraCluster,
    pub docdb: DocDbCluster,
    pub redis: RedisCluster,
    pub storage_bucket: StorageBucket,
}

impl ManagedServices {
    pub fn new(config: &InfraConfig, base: &BaseInfrastructure) -> Self {
        let private: Vec<String> = base
            .private_subnets()
            .iter()
            .map(|s| s.name.clone())
            .collect();

        let aurora_id = config.resource_name("aurora");
        let docdb_id = config.resource_name("docdb");
        let redis_id = config.resource_name("redis");

        Self {
            aurora: AuroraCluster {
                writer_endpoint: format!(
                    "{aurora_id}.cluster.{}.rds.amazonaws.com",
                    config.region
                ),
                reader_endpoint: format!(
                    "{aurora_id}.cluster-ro.{}.rds.amazonaws.com",
                    config.region
                ),
                identifier: aurora_id,
                engine: "aurora-postgresql".to_string(),
                port: 5432,
                database_name: "supabase".to_string(),
                secret_name: config.resource_name("aurora-credentials"),
                security_group: base.rds_sg.name.clone(),
                subnets: private.clone(),
            },
            docdb: DocDbCluster {
                endpoint: format!("{docdb_id}.{}.docdb.amazonaws.com", config.region),
                identifier: docdb_id,
                port: 27017,
                secret_name: config.resource_name("docdb-credentials"),
                security_group: base.docdb_sg.name.clone(),
                subnets: private.clone(),
            },
            redis: RedisCluster {
                endpoint: format!("{redis_id}.{}.cache.amazonaws.com", config.region),
                identifier: redis_id,
                port: 6379,
                security_group: base.redis_sg.name.clone(),
                subnets: private,
            },
            storage_bucket: StorageBucket {
                name: format!("{}-{}", config.resource_name("storage"), config.account),
                versioned: true,
                block_public_access: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tests::test_config;

    #[test]
    fn services_attach_to_base_security_groups_and_subnets() {
        let config = test_config();
        let base = BaseInfrastructure::new(&config);
        let managed = ManagedServices::new(&config, &base);

        assert_eq!(managed.aurora.security_group, base.rds_sg.name);
        assert_eq!(managed.docdb.security_group, base.docdb_sg.name);
        assert_eq!(managed.redis.security_group, base.redis_sg.name);
        assert_eq!(
            managed.aurora.subnets.len(),
            base.private_subnets().len()
        );
    }

    #[test]
    fn bucket_name_includes_account_for_global_uniqueness() {
        let config = test_config();
        let base = BaseInfrastructure::new(&config);
        let managed = ManagedServices::new(&config, &base);
        assert!(managed.storage_bucket.name.ends_with(&config.account));
        assert!(managed.storage_bucket.block_public_access);
    }
}
