/// Image generator client — the single point of entry for all calls to the external
/// image-generation provider.
///
/// Two call shapes are supported and picked once at startup:
/// - `EditCapableGenerator`: image-conditioned edit (`/images/edits`, multipart)
/// - `GenerateOnlyGenerator`: prompt-only generation (`/images/generations`, JSON)
///
/// No retries: a failed call is reported once and the request is aborted.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, GeneratorStrategy};

/// Encoding requested from the provider for every render.
pub const OUTPUT_FORMAT: &str = "png";

#[derive(Debug, Error)]
pub enum ImageGenError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("image provider returned no decodable image data")]
    EmptyResponse,
}

/// Everything the provider needs for one render.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Uploaded eye photo. Ignored by prompt-only generators.
    pub source_image: Vec<u8>,
    pub source_mime: String,
    /// `{width}x{height}`
    pub size: String,
}

/// External image generator. Held in `AppState` as `Arc<dyn IrisGenerator>`.
#[async_trait]
pub trait IrisGenerator: Send + Sync {
    /// Short strategy name for logs.
    fn strategy(&self) -> &'static str;

    /// Returns the raw bytes of the generated image.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>, ImageGenError>;
}

/// Builds the generator selected by `config.generator`.
pub fn build_generator(config: &Config) -> Result<Arc<dyn IrisGenerator>, ImageGenError> {
    let api = ImagesApi::new(config)?;
    let generator: Arc<dyn IrisGenerator> = match config.generator {
        GeneratorStrategy::EditCapable => Arc::new(EditCapableGenerator { api }),
        GeneratorStrategy::GenerateOnly => Arc::new(GenerateOnlyGenerator { api }),
    };
    info!(
        "Image generator initialized (model: {}, strategy: {})",
        config.image_model,
        generator.strategy()
    );
    Ok(generator)
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ImagesGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    output_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared HTTP core
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct ImagesApi {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl ImagesApi {
    fn new(config: &Config) -> Result<Self, ImageGenError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: config.openai_api_base.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.image_model.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn finish(&self, response: Response) -> Result<Vec<u8>, ImageGenError> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(provider_error(status.as_u16(), &body));
        }

        let image = decode_first_image(&body)?;
        debug!(bytes = image.len(), "image provider call succeeded");
        Ok(image)
    }
}

/// Builds the error for a non-2xx provider response, preferring its `error.message`.
fn provider_error(status: u16, body: &[u8]) -> ImageGenError {
    let raw = String::from_utf8_lossy(body).into_owned();
    let message = serde_json::from_slice::<ProviderError>(body)
        .map(|e| e.error.message)
        .unwrap_or(raw);
    let message = if message.trim().is_empty() {
        format!("empty response body (status {status})")
    } else {
        message
    };
    ImageGenError::Api { status, message }
}

/// Pulls the first `data[].b64_json` payload out of an Images API response body.
fn decode_first_image(body: &[u8]) -> Result<Vec<u8>, ImageGenError> {
    let parsed: ImagesResponse =
        serde_json::from_slice(body).map_err(|_| ImageGenError::EmptyResponse)?;

    let b64 = parsed
        .data
        .into_iter()
        .find_map(|d| d.b64_json)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ImageGenError::EmptyResponse)?;

    let bytes = BASE64
        .decode(b64.trim().as_bytes())
        .map_err(|_| ImageGenError::EmptyResponse)?;
    if bytes.is_empty() {
        return Err(ImageGenError::EmptyResponse);
    }
    Ok(bytes)
}

// ────────────────────────────────────────────────────────────────────────────
// Strategies
// ────────────────────────────────────────────────────────────────────────────

/// Sends the uploaded eye photo alongside the prompt.
pub struct EditCapableGenerator {
    api: ImagesApi,
}

#[async_trait]
impl IrisGenerator for EditCapableGenerator {
    fn strategy(&self) -> &'static str {
        "edit"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>, ImageGenError> {
        let image_part = multipart::Part::bytes(request.source_image.clone())
            .file_name(file_name_for_mime(&request.source_mime))
            .mime_str(&request.source_mime)
            .map_err(|e| {
                ImageGenError::InvalidRequest(format!(
                    "invalid image mime '{}': {e}",
                    request.source_mime
                ))
            })?;

        let form = multipart::Form::new()
            .text("model", self.api.model.clone())
            .text("prompt", request.prompt.clone())
            .text("n", "1")
            .text("size", request.size.clone())
            .text("output_format", OUTPUT_FORMAT)
            .part("image", image_part);

        debug!(size = %request.size, "calling image edit endpoint");
        let response = self
            .api
            .client
            .post(self.api.endpoint("images/edits"))
            .bearer_auth(&self.api.api_key)
            .multipart(form)
            .send()
            .await?;

        self.api.finish(response).await
    }
}

/// Prompt-only generation for providers without an edit endpoint.
pub struct GenerateOnlyGenerator {
    api: ImagesApi,
}

#[async_trait]
impl IrisGenerator for GenerateOnlyGenerator {
    fn strategy(&self) -> &'static str {
        "generate"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>, ImageGenError> {
        let body = ImagesGenerateRequest {
            model: &self.api.model,
            prompt: &request.prompt,
            n: 1,
            size: &request.size,
            output_format: OUTPUT_FORMAT,
        };

        debug!(size = %request.size, "calling image generation endpoint");
        let response = self
            .api
            .client
            .post(self.api.endpoint("images/generations"))
            .bearer_auth(&self.api.api_key)
            .json(&body)
            .send()
            .await?;

        self.api.finish(response).await
    }
}

fn file_name_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "eye.jpg",
        "image/webp" => "eye.webp",
        _ => "eye.png",
    }
}
