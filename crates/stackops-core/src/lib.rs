pub mod credentials;
pub mod envfile;
pub mod error;
pub mod infra;
pub mod io;
pub mod paths;
pub mod saml;
pub mod templates;
pub mod update;
pub mod urls;
pub mod versions;

pub use error::{OpsError, Result};
