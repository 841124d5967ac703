//! Video generation
//!
//! Sends one prompt, with optional reference images, to a Veo model's
//! `:predict` method and returns the first prediction.

use crate::gcp::client::GcpClient;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Model used when none is given
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-001";

/// Why a generation request could not be made or answered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("Prompt is required")]
    EmptyPrompt,
    #[error("No predictions returned")]
    NoPredictions,
}

/// One reference image, base64 encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBytes {
    pub image_bytes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInputConfig {
    pub images: Vec<ImageBytes>,
}

/// Prompt instance of a predict request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInstance {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_input_config: Option<ImageInputConfig>,
}

/// Fixed generation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters {
    pub sample_count: u32,
    pub duration_seconds: u32,
    pub fps: u32,
    pub aspect_ratio: String,
    pub enable_audio: bool,
}

impl Default for VideoParameters {
    fn default() -> Self {
        Self {
            sample_count: 1,
            duration_seconds: 5,
            fps: 24,
            aspect_ratio: "16:9".to_string(),
            enable_audio: false,
        }
    }
}

/// Body of a `:predict` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Value>,
}

impl PredictRequest {
    /// Build a request for `prompt`.
    ///
    /// `images` are base64 strings; a `data:image/...;base64,` prefix is
    /// stripped. A blank prompt is rejected.
    pub fn new(prompt: &str, images: &[String]) -> Result<Self, GenerateError> {
        if prompt.trim().is_empty() {
            return Err(GenerateError::EmptyPrompt);
        }

        let image_input_config = (!images.is_empty()).then(|| ImageInputConfig {
            images: images
                .iter()
                .map(|image| ImageBytes {
                    image_bytes: strip_data_url(image).to_string(),
                })
                .collect(),
        });

        Ok(Self {
            instances: vec![VideoInstance {
                prompt: prompt.to_string(),
                image_input_config,
            }],
            parameters: VideoParameters::default(),
        })
    }

    pub fn prompt(&self) -> &str {
        self.instances
            .first()
            .map(|i| i.prompt.as_str())
            .unwrap_or_default()
    }

    pub fn image_count(&self) -> usize {
        self.instances
            .iter()
            .filter_map(|i| i.image_input_config.as_ref())
            .map(|c| c.images.len())
            .sum()
    }
}

/// Drop a `data:image/<type>;base64,` prefix
fn strip_data_url(image: &str) -> &str {
    let Some(rest) = image.strip_prefix("data:image/") else {
        return image;
    };
    match rest.split_once(";base64,") {
        Some((subtype, data))
            if !subtype.is_empty()
                && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            data
        }
        _ => image,
    }
}

/// Read an image file and encode it for a request
pub fn encode_image_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}

/// Where the generated video can be found, if the prediction names it
pub fn video_uri(prediction: &Value) -> Option<&str> {
    ["videoUri", "video", "gcsUri"]
        .iter()
        .find_map(|field| prediction.get(field).and_then(Value::as_str))
}

impl GcpClient {
    /// Ask `publisher/model` for a video and return the first prediction
    pub async fn generate_video(
        &self,
        publisher: &str,
        model: &str,
        request: &PredictRequest,
    ) -> Result<Value> {
        let url = self.aiplatform_url(&format!(
            "v1/projects/{}/locations/{}/publishers/{}/models/{}:predict",
            self.project_id, self.region, publisher, model
        ))?;

        tracing::info!(
            "Generating video with {} ({} reference images)",
            model,
            request.image_count()
        );

        let response: PredictResponse = self.post(&url, request).await?;
        response
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| GenerateError::NoPredictions.into())
    }
}
