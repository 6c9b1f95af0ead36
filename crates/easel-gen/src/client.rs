//! Generation client
//!
//! [`GenerationClient`] is the canvas's [`ImageGenerator`]: it mints ids for
//! backend results, records lineage, and fans variation requests out in
//! parallel.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use easel_canvas::{
    EntityId, GeneratedImage, ImageGenerator, LineageRecorder, RelationshipKind,
    VariationResult, VARIATION_SLOTS,
};

use crate::backend::{ImageBackend, OpenAiImageBackend};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::variator::{ChatPromptVariator, PromptVariator};

/// Image generator backed by an [`ImageBackend`] and a [`PromptVariator`]
pub struct GenerationClient {
    backend: Arc<dyn ImageBackend>,
    variator: Arc<dyn PromptVariator>,
    lineage: Option<Arc<dyn LineageRecorder>>,
    name: String,
}

impl GenerationClient {
    /// Create a client from its parts
    #[must_use]
    pub fn new(backend: Arc<dyn ImageBackend>, variator: Arc<dyn PromptVariator>) -> Self {
        Self {
            backend,
            variator,
            lineage: None,
            name: "generation".to_string(),
        }
    }

    /// Create an OpenAI-backed client from configuration
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let backend = OpenAiImageBackend::new(config)?;
        let variator = ChatPromptVariator::new(config)?;
        Ok(Self::new(Arc::new(backend), Arc::new(variator)).with_name("openai"))
    }

    /// Record generated images and variation edges
    #[must_use]
    pub fn with_lineage(mut self, lineage: Arc<dyn LineageRecorder>) -> Self {
        self.lineage = Some(lineage);
        self
    }

    /// Set the name reported in logs
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    async fn generate_one(&self, prompt: &str, size: u32) -> Result<GeneratedImage> {
        let url = self.backend.generate(prompt, size).await?;
        if url.trim().is_empty() {
            return Err(Error::InvalidResponse("empty image url".to_string()));
        }
        let id = EntityId::new(Uuid::new_v4().to_string());
        if let Some(lineage) = &self.lineage {
            if let Err(e) = lineage.record_image(&id, prompt).await {
                warn!(image_id = %id, error = %e, "failed to record generated image");
            }
        }
        Ok(GeneratedImage::new(id, url, prompt))
    }

    async fn generate_variant(
        &self,
        prompt: String,
        parent_id: &EntityId,
        size: u32,
    ) -> VariationResult {
        match self.generate_one(&prompt, size).await {
            Ok(image) => {
                if let Some(lineage) = &self.lineage {
                    if let Err(e) = lineage
                        .record_relationship(parent_id, &image.id, RelationshipKind::Variation)
                        .await
                    {
                        warn!(%parent_id, image_id = %image.id, error = %e, "failed to record variation");
                    }
                }
                VariationResult::success(image)
            }
            Err(e) => {
                warn!(%parent_id, error = %e, "variation failed");
                VariationResult::failure(prompt, e.to_string())
            }
        }
    }
}

#[async_trait]
impl ImageGenerator for GenerationClient {
    #[instrument(skip(self, prompt), fields(generator = %self.name))]
    async fn generate_image(&self, prompt: &str, size: u32) -> easel_canvas::Result<GeneratedImage> {
        let image = self.generate_one(prompt, size).await?;
        info!(image_id = %image.id, "image generated");
        Ok(image)
    }

    #[instrument(skip(self, prompt, parent_id), fields(generator = %self.name, %parent_id))]
    async fn generate_variations(
        &self,
        prompt: &str,
        parent_id: &EntityId,
        size: u32,
    ) -> Vec<VariationResult> {
        let prompts = match self.variator.vary(prompt, VARIATION_SLOTS).await {
            Ok(prompts) => prompts,
            Err(e) => {
                warn!(error = %e, "prompt variation failed");
                let message = format!("prompt variation failed: {e}");
                return (0..VARIATION_SLOTS)
                    .map(|_| VariationResult::failure(prompt, message.clone()))
                    .collect();
            }
        };

        let results = join_all(
            prompts
                .into_iter()
                .map(|p| self.generate_variant(p, parent_id, size)),
        )
        .await;
        let succeeded = results.iter().filter(|r| !r.is_error()).count();
        info!(succeeded, total = results.len(), "variations generated");
        results
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("name", &self.name)
            .field("lineage", &self.lineage.is_some())
            .finish_non_exhaustive()
    }
}
