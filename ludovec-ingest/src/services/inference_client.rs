//! Inference gateway client
//!
//! One HTTP client for the external inference gateway, implementing all
//! four model seams: vision captioning, image embedding, text embedding,
//! and search-grounded generation. Constructed once at process start and
//! shared behind `Arc`s; per-call timeouts apply, retries happen in the
//! callers through the shared retry wrapper.

use crate::types::{GroundedGenerator, ImageEmbedder, InferenceError, TextEmbedder, VisionCaptioner};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Model identifiers used by the gateway
#[derive(Debug, Clone)]
pub struct ModelIds {
    pub vision: String,
    pub image_embed: String,
    pub text_embed: String,
    pub grounded: String,
}

impl Default for ModelIds {
    fn default() -> Self {
        Self {
            vision: "vision-caption-1".to_string(),
            image_embed: "image-embed-1".to_string(),
            text_embed: "text-embed-1".to_string(),
            grounded: "search-grounded-1".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CaptionRequest<'a> {
    model: &'a str,
    image_url: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    grounding: &'a str,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

/// HTTP client for the inference gateway
pub struct InferenceGateway {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    models: ModelIds,
}

impl InferenceGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        models: ModelIds,
    ) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            models,
        })
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, InferenceError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(InferenceError::RateLimited);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(InferenceError::Server(status.as_u16(), detail));
        }

        response
            .json()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))
    }

    async fn embed(
        &self,
        model: &str,
        input: &str,
        dimensions: Option<usize>,
    ) -> Result<Vec<f32>, InferenceError> {
        let response: EmbeddingResponse = self
            .post_json(
                "/v1/embeddings",
                &EmbeddingRequest { model, input, dimensions },
            )
            .await?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .unwrap_or_default();

        if vector.is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(vector)
    }
}

fn map_transport_error(e: reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Network(e.to_string())
    }
}

fn non_empty(text: String) -> Result<String, InferenceError> {
    if text.trim().is_empty() {
        Err(InferenceError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[async_trait::async_trait]
impl VisionCaptioner for InferenceGateway {
    async fn caption(&self, image_url: &str, prompt: &str) -> Result<String, InferenceError> {
        let response: TextResponse = self
            .post_json(
                "/v1/caption",
                &CaptionRequest {
                    model: &self.models.vision,
                    image_url,
                    prompt,
                },
            )
            .await?;
        non_empty(response.text)
    }
}

#[async_trait::async_trait]
impl ImageEmbedder for InferenceGateway {
    async fn embed_image(&self, image_url: &str) -> Result<Vec<f32>, InferenceError> {
        self.embed(&self.models.image_embed, image_url, None).await
    }

    fn model_name(&self) -> &str {
        &self.models.image_embed
    }
}

#[async_trait::async_trait]
impl TextEmbedder for InferenceGateway {
    async fn embed_text(
        &self,
        text: &str,
        target_dim: Option<usize>,
    ) -> Result<Vec<f32>, InferenceError> {
        self.embed(&self.models.text_embed, text, target_dim).await
    }

    fn model_name(&self) -> &str {
        &self.models.text_embed
    }
}

#[async_trait::async_trait]
impl GroundedGenerator for InferenceGateway {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let response: TextResponse = self
            .post_json(
                "/v1/generate",
                &GenerateRequest {
                    model: &self.models.grounded,
                    prompt,
                    grounding: "web_search",
                },
            )
            .await?;
        non_empty(response.text)
    }
}
