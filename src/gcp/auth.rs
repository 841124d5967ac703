//! GCP Authentication
//!
//! Service-account credentials parsed from the env file, and the token source the
//! client draws bearer tokens from.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Service-account key as found in the env file.
///
/// Only the fields the tool looks at are decoded; the raw JSON is kept for
/// building the signer.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub project_id: Option<String>,
    pub client_email: Option<String>,
    pub private_key_id: Option<String>,
    #[serde(skip)]
    raw: String,
}

impl ServiceAccountKey {
    /// Parse a key from its JSON text
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let mut key: Self = serde_json::from_str(raw)?;
        key.project_id = key
            .project_id
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        key.raw = raw.to_string();
        Ok(key)
    }

    pub fn raw_json(&self) -> &str {
        &self.raw
    }
}

// Security: never print key material
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("type", &self.account_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

/// Anything that can hand out a bearer token for API calls
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, Result<String>>;
}

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    provider: Arc<dyn TokenProvider>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    /// Check if this cached token is still valid
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    /// Create credentials from a service-account key
    pub fn from_service_account(key: &ServiceAccountKey) -> Result<Self> {
        let account = CustomServiceAccount::from_json(key.raw_json())
            .context("Failed to load service account credentials")?;

        tracing::info!(
            "Using service account {}",
            key.client_email.as_deref().unwrap_or("<unknown>")
        );

        Ok(Self {
            provider: Arc::new(account),
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Get an access token for API calls
    /// Security: Checks token expiry before returning cached token
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self
            .provider
            .token(DEFAULT_SCOPES)
            .await
            .context("Failed to get access token")?;

        let token_str = token.as_str().to_string();
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }
}

impl AccessTokenSource for GcpCredentials {
    fn access_token(&self) -> BoxFuture<'_, Result<String>> {
        self.get_token().boxed()
    }
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn is_valid_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    match project.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }

    if project.ends_with('-') {
        return false;
    }

    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
