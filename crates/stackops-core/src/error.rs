use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("not a StackAI installation root: {0} (expected docker-compose.yml, stackend/ and stackweb/)")]
    NotAnInstallRoot(PathBuf),

    #[error("env file not found: {0}")]
    EnvFileNotFound(PathBuf),

    #[error("variable {0} not found")]
    EnvKeyNotFound(String),

    #[error("invalid provider id '{0}': must be a UUID")]
    InvalidProviderId(String),

    #[error("no valid domains provided")]
    NoDomains,

    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("admin API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("version {0} not found in the versions config (available: {1})")]
    UnknownVersion(String, String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("marker '{marker}' not found in {file}")]
    MarkerNotFound { marker: String, file: PathBuf },

    #[error("template document is missing its 'key' field")]
    TemplateKeyMissing,

    #[error("duplicate template key '{0}'")]
    DuplicateTemplateKey(String),

    #[error("release archive has no content root (expected a single top-level directory)")]
    ArchiveLayoutUnknown,

    #[error("step '{step}' failed with {status}")]
    StepFailed { step: String, status: String },

    #[error("{0} not found on PATH")]
    BinaryNotFound(&'static str),

    #[error("invalid infra config: {0}")]
    InvalidInfraConfig(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error(transparent)]
    Bson(#[from] mongodb::bson::de::Error),

    #[error(transparent)]
    BsonSer(#[from] mongodb::bson::ser::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("invalid TOML in {file}: {message}")]
    Toml { file: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, OpsError>;
