//! Integration tests for the publisher-model listing using wiremock
//!
//! These tests drive `GcpClient::list_publisher_models` and
//! `GcpClient::generate_video` against mocked endpoints, covering pagination,
//! request headers, request bodies and API failures.

use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt};
use serde_json::json;
use std::sync::Arc;
use veoscan::gcp::http::ApiError;
use veoscan::generate::GenerateError;
use veoscan::{AccessTokenSource, CatalogEntry, GcpClient, PredictRequest};
use wiremock::matchers::{body_partial_json, bearer_token, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODELS_PATH: &str = "/v1beta1/publishers/google/models";
const PREDICT_PATH: &str =
    "/v1/projects/test-project/locations/us-central1/publishers/google/models/veo-3.1-fast-generate-001:predict";

struct StaticToken(&'static str);

impl AccessTokenSource for StaticToken {
    fn access_token(&self) -> BoxFuture<'_, anyhow::Result<String>> {
        let token = self.0.to_string();
        async move { Ok(token) }.boxed()
    }
}

fn client_for(server: &MockServer) -> GcpClient {
    GcpClient::new(Arc::new(StaticToken("test-token")), "test-project", "us-central1")
        .expect("client")
        .with_endpoint(&server.uri())
        .expect("endpoint")
}

fn model_ids(entries: &[CatalogEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.model_id.as_str()).collect()
}

mod listing_tests {
    use super::*;

    /// Test a single page is decoded into catalog entries
    #[tokio::test]
    async fn test_single_page_with_auth_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .and(bearer_token("test-token"))
            .and(header("x-goog-user-project", "test-project"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "publisherModels": [
                    {"name": "publishers/google/models/veo-2", "versionId": "001"},
                    {"name": "publishers/google/models/gemini-pro"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).with_quota_project("test-project");
        let entries: Vec<CatalogEntry> = client
            .list_publisher_models("google", None)
            .try_collect()
            .await
            .expect("listing should succeed");

        assert_eq!(model_ids(&entries), vec!["veo-2", "gemini-pro"]);
        assert_eq!(entries[0].resource_name, "publishers/google/models/veo-2@001");
    }

    /// Test no quota project header is sent unless one was set
    #[tokio::test]
    async fn test_quota_project_header_omitted_by_default() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entries: Vec<CatalogEntry> = client
            .list_publisher_models("google", None)
            .try_collect()
            .await
            .expect("listing should succeed");
        assert!(entries.is_empty());

        let requests = server.received_requests().await.expect("recorded requests");
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("x-goog-user-project"));
    }

    /// Test pages are followed through nextPageToken in order
    #[tokio::test]
    async fn test_pagination_with_next_page_token() {
        let server = MockServer::start().await;

        // First page
        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .and(query_param("pageSize", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "publisherModels": [
                    {"name": "publishers/google/models/m-1"},
                    {"name": "publishers/google/models/m-2"}
                ],
                "nextPageToken": "token-page-2"
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        // Second page
        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .and(query_param("pageSize", "2"))
            .and(query_param("pageToken", "token-page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "publisherModels": [
                    {"name": "publishers/google/models/m-3"}
                ],
                "nextPageToken": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entries: Vec<CatalogEntry> = client
            .list_publisher_models("google", Some(2))
            .try_collect()
            .await
            .expect("listing should succeed");

        assert_eq!(model_ids(&entries), vec!["m-1", "m-2", "m-3"]);
    }

    /// Test the stream is lazy: nothing is fetched until it is polled
    #[tokio::test]
    async fn test_stream_is_lazy() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let models = client.list_publisher_models("google", None);
        drop(models);
    }

    /// Test an empty catalog yields no entries
    #[tokio::test]
    async fn test_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entries: Vec<CatalogEntry> = client
            .list_publisher_models("google", None)
            .try_collect()
            .await
            .expect("listing should succeed");

        assert!(entries.is_empty());
    }

    /// Test 403 response surfaces as an ApiError with Google's message
    #[tokio::test]
    async fn test_403_returns_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Vertex AI API has not been used in project test-project",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .list_publisher_models("google", None)
            .try_collect::<Vec<_>>()
            .await
            .expect_err("listing should fail");

        let api_error = err.downcast_ref::<ApiError>().expect("ApiError in chain");
        assert_eq!(api_error.status.as_u16(), 403);
        assert!(api_error.message.contains("PERMISSION_DENIED"));
    }

    /// Test a failure on a later page still yields the earlier entries first
    #[tokio::test]
    async fn test_error_on_second_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "publisherModels": [{"name": "publishers/google/models/m-1"}],
                "nextPageToken": "next"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .and(query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let models = client.list_publisher_models("google", None);
        futures::pin_mut!(models);

        let first = models.try_next().await.expect("first page").expect("entry");
        assert_eq!(first.model_id, "m-1");

        let err = models.try_next().await.expect_err("second page fails");
        let api_error = err.downcast_ref::<ApiError>().expect("ApiError in chain");
        assert_eq!(api_error.status.as_u16(), 503);
    }

    /// Test a malformed body is reported rather than treated as empty
    #[tokio::test]
    async fn test_malformed_json_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .list_publisher_models("google", None)
            .try_collect::<Vec<_>>()
            .await
            .expect_err("listing should fail");

        assert!(err.to_string().contains("Failed to parse response JSON"));
    }
}

mod predict_tests {
    use super::*;

    /// Test the predict call posts the prompt, images and fixed parameters
    #[tokio::test]
    async fn test_predict_request_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .and(bearer_token("test-token"))
            .and(body_partial_json(json!({
                "instances": [{
                    "prompt": "a paper boat on a river",
                    "image_input_config": {"images": [{"imageBytes": "QUJD"}]}
                }],
                "parameters": {
                    "sampleCount": 1,
                    "durationSeconds": 5,
                    "fps": 24,
                    "aspectRatio": "16:9",
                    "enableAudio": false
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{"videoUri": "gs://bucket/boat.mp4"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = PredictRequest::new(
            "a paper boat on a river",
            &["data:image/png;base64,QUJD".to_string()],
        )
        .expect("valid request");

        let prediction = client
            .generate_video("google", "veo-3.1-fast-generate-001", &request)
            .await
            .expect("prediction");

        assert_eq!(prediction["videoUri"], "gs://bucket/boat.mp4");
    }

    /// Test a response without predictions is an error
    #[tokio::test]
    async fn test_empty_predictions() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": []})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = PredictRequest::new("a cat", &[]).expect("valid request");
        let err = client
            .generate_video("google", "veo-3.1-fast-generate-001", &request)
            .await
            .expect_err("no predictions");

        assert_eq!(
            err.downcast_ref::<GenerateError>(),
            Some(&GenerateError::NoPredictions)
        );
    }

    /// Test API failures on predict surface as ApiError
    #[tokio::test]
    async fn test_predict_400_returns_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "Unsupported image format",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = PredictRequest::new("a cat", &["@@@".to_string()]).expect("valid request");
        let err = client
            .generate_video("google", "veo-3.1-fast-generate-001", &request)
            .await
            .expect_err("predict should fail");

        let api_error = err.downcast_ref::<ApiError>().expect("ApiError in chain");
        assert_eq!(api_error.status.as_u16(), 400);
        assert_eq!(api_error.message, "Unsupported image format (INVALID_ARGUMENT)");
    }
}
