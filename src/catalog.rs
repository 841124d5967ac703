//! Model Garden catalog
//!
//! Lists publisher models as a lazy stream. Pages are fetched as the stream is
//! polled; callers never see page tokens.

use crate::gcp::client::GcpClient;
use anyhow::Result;
use futures::stream::{self, Stream, TryStreamExt};
use serde::Deserialize;

/// Publisher model as returned by the API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherModel {
    /// e.g. `publishers/google/models/veo-2`
    pub name: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub launch_stage: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPublisherModelsResponse {
    #[serde(default)]
    publisher_models: Vec<PublisherModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// One entry of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub model_id: String,
    /// `name@version` when the API reports a version
    pub resource_name: String,
}

impl From<PublisherModel> for CatalogEntry {
    fn from(model: PublisherModel) -> Self {
        let model_id = model
            .name
            .rsplit('/')
            .next()
            .unwrap_or(&model.name)
            .to_string();

        let resource_name = match model.version_id.as_deref() {
            Some(version) if !version.is_empty() => format!("{}@{}", model.name, version),
            _ => model.name.clone(),
        };

        Self {
            name: model.name,
            model_id,
            resource_name,
        }
    }
}

/// One page of results
struct Page {
    entries: Vec<CatalogEntry>,
    next_token: Option<String>,
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

impl GcpClient {
    /// List the publisher's models.
    ///
    /// The returned stream is single-pass. Each poll past the end of a page
    /// fetches the next one.
    pub fn list_publisher_models<'a>(
        &'a self,
        publisher: &'a str,
        page_size: Option<u32>,
    ) -> impl Stream<Item = Result<CatalogEntry>> + 'a {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let token = match cursor {
                Cursor::Done => return Ok::<_, anyhow::Error>(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let page = self
                .list_publisher_models_page(publisher, page_size, token.as_deref())
                .await?;

            let next = match page.next_token {
                Some(token) => Cursor::Next(token),
                None => Cursor::Done,
            };
            Ok::<_, anyhow::Error>(Some((page.entries, next)))
        })
        .map_ok(|entries| stream::iter(entries.into_iter().map(Ok)))
        .try_flatten()
    }

    async fn list_publisher_models_page(
        &self,
        publisher: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<Page> {
        let mut url = self.aiplatform_url(&format!("v1beta1/publishers/{}/models", publisher))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(size) = page_size {
                query.append_pair("pageSize", &size.to_string());
            }
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        // An empty query_pairs_mut still leaves a trailing '?'
        if url.query() == Some("") {
            url.set_query(None);
        }

        let response: ListPublisherModelsResponse = self.get(&url).await?;

        tracing::debug!(
            "Fetched {} publisher models (more pages: {})",
            response.publisher_models.len(),
            response.next_page_token.as_deref().is_some_and(|t| !t.is_empty())
        );

        Ok(Page {
            entries: response
                .publisher_models
                .into_iter()
                .map(CatalogEntry::from)
                .collect(),
            next_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, version: Option<&str>) -> PublisherModel {
        PublisherModel {
            name: name.to_string(),
            version_id: version.map(String::from),
            launch_stage: None,
        }
    }

    #[test]
    fn test_entry_from_publisher_model() {
        let entry = CatalogEntry::from(model("publishers/google/models/veo-2", Some("001")));
        assert_eq!(entry.name, "publishers/google/models/veo-2");
        assert_eq!(entry.model_id, "veo-2");
        assert_eq!(entry.resource_name, "publishers/google/models/veo-2@001");
    }

    #[test]
    fn test_entry_without_version() {
        let entry = CatalogEntry::from(model("publishers/google/models/gemini-pro", None));
        assert_eq!(entry.model_id, "gemini-pro");
        assert_eq!(entry.resource_name, "publishers/google/models/gemini-pro");
    }

    #[test]
    fn test_bare_name_is_its_own_id() {
        let entry = CatalogEntry::from(model("imagen-3", Some("")));
        assert_eq!(entry.model_id, "imagen-3");
        assert_eq!(entry.resource_name, "imagen-3");
    }

    #[test]
    fn test_response_decoding() {
        let body = r#"{
            "publisherModels": [
                {"name": "publishers/google/models/veo-2", "versionId": "001", "launchStage": "GA"},
                {"name": "publishers/google/models/gemini-pro"}
            ],
            "nextPageToken": "abc"
        }"#;
        let response: ListPublisherModelsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.publisher_models.len(), 2);
        assert_eq!(response.publisher_models[0].launch_stage.as_deref(), Some("GA"));
        assert_eq!(response.next_page_token.as_deref(), Some("abc"));

        let empty: ListPublisherModelsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.publisher_models.is_empty());
        assert!(empty.next_page_token.is_none());
    }
}
