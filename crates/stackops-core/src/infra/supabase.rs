//! Supabase workloads on the cluster plus the edge-functions API.

use super::eks::EksCluster;
use super::managed::ManagedServices;
use super::InfraConfig;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Workload {
    pub name: String,
    pub image: String,
    pub replicas: u32,
    pub port: u16,
    pub service_account: Option<String>,
    /// Environment wired from the managed layer.
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeApi {
    pub name: String,
    pub url: String,
    pub stage: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupabaseServices {
    pub namespace: String,
    pub workloads: Vec<Workload>,
    pub edge_api: EdgeApi,
}

impl SupabaseServices {
    pub fn new(
        config: &InfraConfig,
        managed: &ManagedServices,
        eks: &EksCluster,
    ) -> Self {
        let db_host = managed.aurora.writer_endpoint.clone();
        let db_env = |name: &str| {
            vec![
                ("DB_HOST".to_string(), db_host.clone()),
                ("DB_PORT".to_string(), managed.aurora.port.to_string()),
                ("DB_NAME".to_string(), managed.aurora.database_name.clone()),
                (
                    "DB_SECRET".to_string(),
                    managed.aurora.secret_name.clone(),
                ),
                ("SERVICE".to_string(), name.to_string()),
            ]
        };

        let account_for = |name: &str| {
            eks.service_accounts
                .iter()
                .find(|sa| sa.name == name)
                .map(|sa| sa.name.clone())
        };

        let mut storage_env = db_env("storage");
        storage_env.push((
            "STORAGE_BUCKET".to_string(),
            managed.storage_bucket.name.clone(),
        ));
        storage_env.push(("AWS_REGION".to_string(), config.region.clone()));

        let edge_name = config.resource_name("edge-functions");
        Self {
            namespace: "supabase".to_string(),
            workloads: vec![
                Workload {
                    name: "gotrue".to_string(),
                    image: "supabase/gotrue:v2.151.0".to_string(),
                    replicas: 2,
                    port: 9999,
                    service_account: account_for("gotrue"),
                    env: db_env("gotrue"),
                },
                Workload {
                    name: "postgrest".to_string(),
                    image: "postgrest/postgrest:v12.0.2".to_string(),
                    replicas: 2,
                    port: 3000,
                    service_account: None,
                    env: db_env("postgrest"),
                },
                Workload {
                    name: "storage".to_string(),
                    image: "supabase/storage-api:v1.0.6".to_string(),
                    replicas: 2,
                    port: 5000,
                    service_account: account_for("storage"),
                    env: storage_env,
                },
                Workload {
                    name: "pg-meta".to_string(),
                    image: "supabase/postgres-meta:v0.80.0".to_string(),
                    replicas: 1,
                    port: 8080,
                    service_account: None,
                    env: db_env("pg-meta"),
                },
            ],
            edge_api: EdgeApi {
                url: format!(
                    "https://{edge_name}.execute-api.{}.amazonaws.com/prod/",
                    config.region
                ),
                name: edge_name,
                stage: "prod".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::base::BaseInfrastructure;
    use crate::infra::tests::test_config;

    #[test]
    fn workloads_point_at_managed_endpoints() {
        let config = test_config();
        let base = BaseInfrastructure::new(&config);
        let managed = ManagedServices::new(&config, &base);
        let eks = EksCluster::new(&config, &base, &managed);
        let supabase = SupabaseServices::new(&config, &managed, &eks);

        assert_eq!(supabase.workloads.len(), 4);
        for workload in &supabase.workloads {
            let host = workload
                .env
                .iter()
                .find(|(k, _)| k == "DB_HOST")
                .map(|(_, v)| v.as_str());
            assert_eq!(host, Some(managed.aurora.writer_endpoint.as_str()));
        }

        let storage = supabase
            .workloads
            .iter()
            .find(|w| w.name == "storage")
            .unwrap();
        assert_eq!(storage.service_account.as_deref(), Some("storage"));
        assert!(storage
            .env
            .iter()
            .any(|(k, v)| k == "STORAGE_BUCKET" && *v == managed.storage_bucket.name));
    }
}
