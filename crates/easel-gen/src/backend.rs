//! Image backends
//!
//! An [`ImageBackend`] turns one prompt into one image URL. The URL is either
//! fetchable (`https://...`) or inline (`data:image/png;base64,...`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::http::ApiClient;

/// Text-to-image backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generate a square image of `size` pixels and return its URL
    async fn generate(&self, prompt: &str, size: u32) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

impl ImageData {
    fn into_url(self) -> Option<String> {
        match (self.url, self.b64_json) {
            (Some(url), _) if !url.trim().is_empty() => Some(url),
            (_, Some(b64)) if !b64.is_empty() => Some(format!("data:image/png;base64,{b64}")),
            _ => None,
        }
    }
}

/// OpenAI `images/generations` backend
#[derive(Debug, Clone)]
pub struct OpenAiImageBackend {
    api: ApiClient,
    model: String,
}

impl OpenAiImageBackend {
    /// Create a backend from configuration
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            model: config.image_model.clone(),
        })
    }
}

#[async_trait]
impl ImageBackend for OpenAiImageBackend {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str, size: u32) -> Result<String> {
        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: format!("{size}x{size}"),
        };
        let response: ImageResponse = self.api.post("images/generations", &request).await?;
        debug!(results = response.data.len(), "image response received");

        response
            .data
            .into_iter()
            .next()
            .and_then(ImageData::into_url)
            .ok_or_else(|| Error::InvalidResponse("no image in response".to_string()))
    }
}
