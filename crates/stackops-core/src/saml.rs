//! SAML/SSO provider management against the Supabase auth admin API.
//!
//! The admin endpoints live behind Kong at
//! `{api_url}/auth/v1/admin/sso/providers[/{id}]` and authenticate with the
//! service-role key. On-prem installations commonly terminate TLS with a
//! self-signed certificate, so certificate verification is disabled.

use crate::envfile::EnvFile;
use crate::error::{OpsError, Result};
use crate::io;
use crate::paths;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use uuid::Uuid;

const ADMIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Kong marker the SSO routes are inserted in front of.
const KONG_SECURE_AUTH_MARKER: &str = "  ## Secure Auth routes";

/// Route name used to detect an already-patched kong.yml.
const KONG_ACS_ROUTE: &str = "auth-v1-open-sso-acs";

const KONG_SAML_ROUTES: &str = r#"  ## Open SSO routes
  - name: auth-v1-open-sso-acs
    url: "http://auth:9999/sso/saml/acs"
    routes:
      - name: auth-v1-open-sso-acs
        strip_path: true
        paths:
        - /auth/v1/sso/saml/acs
        - /sso/saml/acs
    plugins:
      - name: cors
  - name: auth-v1-open-sso-metadata
    url: "http://auth:9999/sso/saml/metadata"
    routes:
      - name: auth-v1-open-sso-metadata
        strip_path: true
        paths:
        - /auth/v1/sso/saml/metadata
    plugins:
      - name: cors

"#;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlProvider {
    pub id: String,
    #[serde(default)]
    pub saml: Option<SamlDetails>,
    #[serde(default)]
    pub domains: Vec<ProviderDomain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlDetails {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub metadata_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDomain {
    pub domain: String,
}

#[derive(Debug, Deserialize)]
struct ProviderList {
    #[serde(default)]
    items: Vec<SamlProvider>,
}

#[derive(Serialize)]
struct AddProviderBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    metadata_url: &'a str,
    domains: &'a [String],
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Split a comma-separated domain list, trimming whitespace and dropping
/// empty entries. An empty result is an error.
pub fn split_domains(raw: &str) -> Result<Vec<String>> {
    let domains: Vec<String> = raw
        .split(',')
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string())
        .collect();
    if domains.is_empty() {
        return Err(OpsError::NoDomains);
    }
    Ok(domains)
}

pub fn validate_provider_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| OpsError::InvalidProviderId(id.to_string()))
}

// ---------------------------------------------------------------------------
// Admin client
// ---------------------------------------------------------------------------

pub struct SamlAdminClient {
    http: reqwest::blocking::Client,
    api_url: String,
    service_role_key: String,
}

impl SamlAdminClient {
    pub fn new(api_url: &str, service_role_key: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(ADMIN_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.to_string(),
        })
    }

    /// Build a client from `supabase/.env` (`SERVICE_ROLE_KEY`,
    /// `API_EXTERNAL_URL`).
    pub fn from_env(root: &Path) -> Result<Self> {
        let env = EnvFile::load(&paths::env_path(root, "supabase"))?;
        let key = env
            .get("SERVICE_ROLE_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OpsError::EnvKeyNotFound("SERVICE_ROLE_KEY".into()))?;
        let api_url = env
            .get("API_EXTERNAL_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OpsError::EnvKeyNotFound("API_EXTERNAL_URL".into()))?;
        Self::new(api_url, key)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn providers_url(&self) -> String {
        format!("{}/auth/v1/admin/sso/providers", self.api_url)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        self.http
            .request(method, url)
            .header("APIKey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    pub fn add_provider(&self, metadata_url: &str, domains: &[String]) -> Result<SamlProvider> {
        let body = AddProviderBody {
            kind: "saml",
            metadata_url,
            domains,
        };
        let response = self
            .request(reqwest::Method::POST, &self.providers_url())
            .json(&body)
            .send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(OpsError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub fn list_providers(&self) -> Result<Vec<SamlProvider>> {
        let response = self
            .request(reqwest::Method::GET, &self.providers_url())
            .send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(OpsError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        let list: ProviderList = serde_json::from_str(&text)?;
        Ok(list.items)
    }

    /// Delete a provider by UUID. A 404 maps to `ProviderNotFound`.
    pub fn delete_provider(&self, provider_id: &Uuid) -> Result<()> {
        let url = format!("{}/{}", self.providers_url(), provider_id);
        let response = self.request(reqwest::Method::DELETE, &url).send()?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OpsError::ProviderNotFound(provider_id.to_string()));
        }
        if !status.is_success() {
            return Err(OpsError::Api {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Status / enable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SamlStatus {
    pub enabled: bool,
    pub acs_url: String,
    pub metadata_url: String,
}

/// Read SAML state from `supabase/.env` without touching the network.
pub fn saml_status(root: &Path) -> Result<SamlStatus> {
    let env = EnvFile::load(&paths::env_path(root, "supabase"))?;
    let api_url = env
        .get("API_EXTERNAL_URL")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OpsError::EnvKeyNotFound("API_EXTERNAL_URL".into()))?;
    let enabled = env
        .get("SAML_ENABLED")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    Ok(SamlStatus {
        enabled,
        acs_url: format!("{api_url}/auth/v1/sso/saml/acs"),
        metadata_url: format!("{api_url}/auth/v1/sso/saml/metadata"),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct EnableReport {
    pub env_updated: bool,
    pub kong_updated: bool,
    pub key_generated: bool,
}

/// Enable SAML: back up the touched files once, set `SAML_ENABLED=true` and
/// `SAML_PRIVATE_KEY` in `supabase/.env`, and add the open SSO routes to
/// kong.yml. `private_key` is a base64 PKCS#1 DER key; when `None` one is
/// generated with the system `openssl`.
pub fn enable_saml(root: &Path, private_key: Option<String>) -> Result<EnableReport> {
    let env_path = paths::env_path(root, "supabase");
    let kong_path = paths::kong_config_path(root);
    if !env_path.is_file() {
        return Err(OpsError::EnvFileNotFound(env_path));
    }
    if !kong_path.is_file() {
        return Err(OpsError::FileNotFound(kong_path));
    }

    io::backup_once(&env_path)?;
    io::backup_once(&kong_path)?;

    let key_generated = private_key.is_none();
    let key = match private_key {
        Some(key) => key,
        None => generate_saml_private_key()?,
    };

    let mut env = EnvFile::load(&env_path)?;
    env.set("SAML_ENABLED", "true");
    env.set("SAML_PRIVATE_KEY", &key);
    env.save(&env_path)?;

    let kong_content = std::fs::read_to_string(&kong_path)?;
    let kong_updated = if kong_content.contains(KONG_ACS_ROUTE) {
        false
    } else {
        io::insert_before_marker(&kong_path, KONG_SECURE_AUTH_MARKER, KONG_SAML_ROUTES)?;
        true
    };

    Ok(EnableReport {
        env_updated: true,
        kong_updated,
        key_generated,
    })
}

/// Generate an RSA 2048 private key as base64-wrapped PKCS#1 DER, the format
/// GoTrue expects in `SAML_PRIVATE_KEY`. Shells out to `openssl`.
pub fn generate_saml_private_key() -> Result<String> {
    let openssl = which::which("openssl").map_err(|_| OpsError::BinaryNotFound("openssl"))?;
    let dir = tempfile::tempdir()?;
    let pem_path = dir.path().join("saml.pem");
    let der_path = dir.path().join("saml.der");

    let status = Command::new(&openssl)
        .arg("genrsa")
        .arg("-out")
        .arg(&pem_path)
        .arg("2048")
        .status()?;
    if !status.success() {
        return Err(OpsError::StepFailed {
            step: "openssl genrsa".into(),
            status: status.to_string(),
        });
    }

    let status = Command::new(&openssl)
        .args(["rsa", "-traditional", "-outform", "DER"])
        .arg("-in")
        .arg(&pem_path)
        .arg("-out")
        .arg(&der_path)
        .status()?;
    if !status.success() {
        return Err(OpsError::StepFailed {
            step: "openssl rsa -outform DER".into(),
            status: status.to_string(),
        });
    }

    let der = std::fs::read(&der_path)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(der);
    Ok(wrap_columns(&encoded, 64))
}

/// Insert a newline every `width` characters, like `base64`'s default output.
fn wrap_columns(s: &str, width: usize) -> String {
    s.as_bytes()
        .chunks(width)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}
