//! Image generation and hosting clients.
//!
//! [`ImageModel`] turns a prompt into a base64 JPEG and tags it;
//! [`ImageHost`] stores the bytes and returns a public URL. The production
//! implementations talk to Cloudflare Workers AI and imgbb.

use std::time::Duration;

use artfeed_common::{
    AppError, AppResult,
    config::{CloudflareConfig, ImgbbConfig},
};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

const TAGS_INSTRUCTION: &str =
    "Generate a list of tags for the image. The list must contain 1 to 10 tags. Each tag must begin with #";

/// Text-to-image and image-to-tags model.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Generate a JPEG for `prompt`, returned as base64.
    async fn generate_image(&self, prompt: &str) -> AppResult<String>;

    /// Describe a base64 JPEG with `#`-prefixed tags.
    async fn generate_tags(&self, image: &str) -> AppResult<Vec<String>>;
}

/// Public image storage.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload a base64 JPEG and return its public URL.
    async fn upload(&self, image: &str) -> AppResult<String>;
}

/// Lower-case a tag and replace spaces and hyphens with underscores.
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace([' ', '-'], "_")
}

fn http_client(timeout_seconds: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    service: &str,
) -> AppResult<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::ExternalService(format!(
            "{service} API error: {status} - {body}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to parse {service} response: {e}")))
}

/// Cloudflare Workers AI client.
#[derive(Clone)]
pub struct CloudflareClient {
    http_client: reqwest::Client,
    config: CloudflareConfig,
}

impl CloudflareClient {
    /// Create a client with the configured request timeout.
    pub fn new(config: CloudflareConfig) -> AppResult<Self> {
        Ok(Self {
            http_client: http_client(config.request_timeout_seconds)?,
            config,
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_id,
            model
        )
    }

    async fn run<T: for<'de> Deserialize<'de>>(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> AppResult<T> {
        let response = self
            .http_client
            .post(self.model_url(model))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Cloudflare request failed: {e}")))?;

        read_json(response, "Cloudflare").await
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct ImageResult {
    image: String,
}

#[derive(Deserialize)]
struct TagsResult {
    response: TagList,
}

#[derive(Deserialize)]
struct TagList {
    tags: Vec<String>,
}

#[async_trait]
impl ImageModel for CloudflareClient {
    async fn generate_image(&self, prompt: &str) -> AppResult<String> {
        tracing::info!(prompt = %prompt, "Generating image");

        let body = json!({
            "prompt": prompt,
            "height": self.config.image_height,
            "width": self.config.image_width,
        });
        let envelope: Envelope<ImageResult> =
            self.run(&self.config.images_model_name, body).await?;

        Ok(envelope.result.image)
    }

    async fn generate_tags(&self, image: &str) -> AppResult<Vec<String>> {
        tracing::info!("Generating tags for image");

        let body = json!({
            "messages": [
                { "role": "system", "content": TAGS_INSTRUCTION },
                {
                    "role": "user",
                    "content": [{
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{image}") },
                    }],
                },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "type": "object",
                    "properties": {
                        "tags": { "type": "array", "items": { "type": "string" } },
                    },
                    "required": ["tags"],
                },
            },
        });
        let envelope: Envelope<TagsResult> = self.run(&self.config.tags_model_name, body).await?;

        Ok(envelope.result.response.tags)
    }
}

/// imgbb upload client.
#[derive(Clone)]
pub struct ImgbbClient {
    http_client: reqwest::Client,
    config: ImgbbConfig,
}

impl ImgbbClient {
    /// Create a client with the configured request timeout.
    pub fn new(config: ImgbbConfig) -> AppResult<Self> {
        Ok(Self {
            http_client: http_client(config.request_timeout_seconds)?,
            config,
        })
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Deserialize)]
struct UploadData {
    url: String,
}

#[async_trait]
impl ImageHost for ImgbbClient {
    async fn upload(&self, image: &str) -> AppResult<String> {
        tracing::info!("Uploading image to imgbb");

        let bytes = STANDARD
            .decode(image.trim())
            .map_err(|e| AppError::ExternalService(format!("Model returned invalid base64: {e}")))?;
        let part = Part::bytes(bytes)
            .file_name("image.jpeg")
            .mime_str("image/jpeg")
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let response = self
            .http_client
            .post(format!("{}/upload", self.config.base_url.trim_end_matches('/')))
            .query(&[("key", self.config.api_key.as_str())])
            .multipart(Form::new().part("image", part))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("imgbb request failed: {e}")))?;

        let uploaded: UploadResponse = read_json(response, "imgbb").await?;
        Ok(uploaded.data.url)
    }
}
