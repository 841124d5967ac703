//! Configuration
//!
//! Run settings, plus extraction of the service-account credential and project id
//! from the env file.

use crate::envfile::EnvFile;
use crate::error::{ConfigError, ConfigResult};
use crate::gcp::auth::ServiceAccountKey;
use std::path::{Path, PathBuf};

/// Env file read from the working directory
pub const DEFAULT_ENV_FILE: &str = ".env.local";
/// Assignment holding the inline service-account JSON
pub const CREDENTIAL_KEY: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";
/// Assignment holding the project id
pub const PROJECT_KEY: &str = "GOOGLE_CLOUD_PROJECT_ID";
pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_PUBLISHER: &str = "google";
/// Entries listed when nothing matches
pub const DEFAULT_PREVIEW_LIMIT: usize = 10;

/// Settings for one run. Built once in `main` and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    pub env_file: PathBuf,
    pub region: String,
    pub publisher: String,
    /// Overrides `https://{region}-aiplatform.googleapis.com`
    pub endpoint: Option<String>,
    pub page_size: Option<u32>,
    pub preview_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            region: DEFAULT_REGION.to_string(),
            publisher: DEFAULT_PUBLISHER.to_string(),
            endpoint: None,
            page_size: None,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

/// Read the env file as text
pub fn read_env_file(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::MissingConfigFile(path.to_path_buf())
        } else {
            ConfigError::ReadConfigFile {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// What the env file provided
#[derive(Debug, Default)]
pub struct Extraction {
    pub credential: Option<ServiceAccountKey>,
    pub project_id: Option<String>,
    /// Problems to report; they never stop the other value from being extracted
    pub diagnostics: Vec<ConfigError>,
}

impl Extraction {
    /// Project to bind the client to: the credential's own project wins
    pub fn resolve_project(&self) -> ConfigResult<String> {
        self.credential
            .as_ref()
            .and_then(|key| key.project_id.clone())
            .or_else(|| self.project_id.clone())
            .ok_or_else(|| ConfigError::MissingProjectId {
                key: CREDENTIAL_KEY.to_string(),
                project_key: PROJECT_KEY.to_string(),
            })
    }
}

/// Pull the credential and project id out of env file content
pub fn extract(content: &str) -> Extraction {
    let file = EnvFile::parse(content);
    let mut extraction = Extraction::default();

    match file.entry(CREDENTIAL_KEY) {
        Some(entry) if entry.quote.is_none() => {
            tracing::warn!("{} on line {} is not quoted", CREDENTIAL_KEY, entry.line);
            extraction.diagnostics.push(ConfigError::CredentialParse(format!(
                "line {}: value must be a quoted JSON object",
                entry.line
            )));
        }
        Some(entry) => match ServiceAccountKey::from_json(&entry.value) {
            Ok(key) => extraction.credential = Some(key),
            Err(e) => {
                tracing::warn!("{} is not valid JSON: {}", CREDENTIAL_KEY, e);
                extraction
                    .diagnostics
                    .push(ConfigError::CredentialParse(e.to_string()));
            }
        },
        None => {
            if let Some(err) = file.error_for(CREDENTIAL_KEY) {
                extraction
                    .diagnostics
                    .push(ConfigError::CredentialParse(err.to_string()));
            }
        }
    }

    extraction.project_id = file
        .get(PROJECT_KEY)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from);

    if extraction.project_id.is_none() {
        if let Some(err) = file.error_for(PROJECT_KEY) {
            tracing::warn!("{} could not be parsed: {}", PROJECT_KEY, err);
        }
    }

    tracing::debug!(
        "env file: {} entries, credential={}, project={:?}",
        file.entries().len(),
        extraction.credential.is_some(),
        extraction.project_id
    );

    extraction
}
