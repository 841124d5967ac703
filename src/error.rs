//! Error types for configuration loading
//!
//! Remote failures travel as `anyhow::Error`; see [`crate::gcp::http::ApiError`]
//! for the typed HTTP failure found inside those chains.

use std::path::PathBuf;

/// Problems found while reading the env file and extracting the launch config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The env file does not exist
    #[error("Error: {} not found.", .0.display())]
    MissingConfigFile(PathBuf),

    /// The env file exists but could not be read
    #[error("Error reading {}: {source}", .path.display())]
    ReadConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A credential assignment was found but its value is not usable JSON
    #[error("Error parsing JSON from env: {0}")]
    CredentialParse(String),

    /// No credential assignment at all
    #[error("Could not find {key} in {}", .file.display())]
    MissingCredential { key: String, file: PathBuf },

    /// Neither the credential nor the project assignment names a project
    #[error("Could not determine the project: set project_id in {key} or set {project_key}")]
    MissingProjectId { key: String, project_key: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
