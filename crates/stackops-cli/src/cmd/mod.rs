pub mod env;
pub mod infra;
pub mod saml;
pub mod templates;
pub mod update;
pub mod versions;
