//! GCP Client
//!
//! Authenticated client context for the Vertex AI REST API, combining a token
//! source and the HTTP client.

use super::auth::{AccessTokenSource, GcpCredentials, ServiceAccountKey};
use super::http::GcpHttpClient;
use crate::config::Settings;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Client bound to a project and region
#[derive(Clone)]
pub struct GcpClient {
    tokens: Arc<dyn AccessTokenSource>,
    http: GcpHttpClient,
    pub project_id: String,
    pub region: String,
    endpoint: Url,
    /// Sent as `x-goog-user-project` when set
    quota_project: Option<String>,
}

/// Quota project to bill: only a project the key itself belongs to
pub fn quota_project_for<'a>(key: &ServiceAccountKey, project_id: &'a str) -> Option<&'a str> {
    (key.project_id.as_deref() == Some(project_id)).then_some(project_id)
}

impl GcpClient {
    /// Create a client talking to the regional Vertex AI endpoint
    pub fn new(tokens: Arc<dyn AccessTokenSource>, project_id: &str, region: &str) -> Result<Self> {
        let endpoint = Url::parse(&format!("https://{}-aiplatform.googleapis.com/", region))
            .with_context(|| format!("Invalid region: {}", region))?;

        Ok(Self {
            tokens,
            http: GcpHttpClient::new()?,
            project_id: project_id.to_string(),
            region: region.to_string(),
            endpoint,
            quota_project: None,
        })
    }

    /// Point the client at a different API root
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        let mut url =
            Url::parse(endpoint).with_context(|| format!("Invalid endpoint: {}", endpoint))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.endpoint = url;
        Ok(self)
    }

    /// Bill requests to `project` through the `x-goog-user-project` header
    pub fn with_quota_project(mut self, project: &str) -> Self {
        self.quota_project = Some(project.to_string());
        self
    }

    /// Build a client from the service-account key and run settings
    pub fn from_settings(
        key: &ServiceAccountKey,
        project_id: &str,
        settings: &Settings,
    ) -> Result<Self> {
        let credentials = GcpCredentials::from_service_account(key)?;
        let mut client = Self::new(Arc::new(credentials), project_id, &settings.region)?;
        if let Some(project) = quota_project_for(key, project_id) {
            client = client.with_quota_project(project);
        }

        match settings.endpoint.as_deref() {
            Some(endpoint) => client.with_endpoint(endpoint),
            None => Ok(client),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.tokens.access_token().await
    }

    /// Make a GET request against the Vertex AI API
    pub async fn get<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let token = self.get_token().await?;
        self.http
            .get_json(url, &token, self.quota_project.as_deref())
            .await
    }

    /// Make a POST request with a JSON body against the Vertex AI API
    pub async fn post<B, T>(&self, url: &Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.get_token().await?;
        self.http
            .post_json(url, &token, self.quota_project.as_deref(), body)
            .await
    }

    /// Build a Vertex AI API URL from a path relative to the endpoint root
    pub fn aiplatform_url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid API path: {}", path))
    }
}
