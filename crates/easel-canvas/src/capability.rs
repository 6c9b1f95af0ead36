//! External capabilities consumed by the orchestrator
//!
//! Image generation, persistence and id allocation are slow, parallel and
//! fallible collaborators. The orchestrator only sees them through these
//! traits, so backends (HTTP, SQLite, in-memory test doubles) are
//! interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::EntityId;
use crate::error::{Error, Result};

/// A single generated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Backend-assigned id of the generation result
    pub id: EntityId,
    /// Fetchable image URL
    pub url: String,
    /// Prompt actually used
    pub prompt: String,
}

impl GeneratedImage {
    /// Create a generated image
    #[must_use]
    pub fn new(id: impl Into<EntityId>, url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            prompt: prompt.into(),
        }
    }

    /// An image with an empty id or URL cannot be placed on the canvas
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.id.is_empty() && !self.url.trim().is_empty()
    }
}

/// Outcome of one variation attempt, index-correlated with the request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariationResult {
    /// Id of the generated variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// URL of the generated variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Prompt the variant was generated from
    #[serde(default)]
    pub prompt: String,
    /// Failure reported for this attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VariationResult {
    /// A successful attempt
    #[must_use]
    pub fn success(image: GeneratedImage) -> Self {
        Self {
            id: Some(image.id),
            url: Some(image.url),
            prompt: image.prompt,
            error: None,
        }
    }

    /// A failed attempt
    #[must_use]
    pub fn failure(prompt: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: None,
            url: None,
            prompt: prompt.into(),
            error: Some(error.into()),
        }
    }

    /// Whether the attempt reported an error
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The usable image, if any. Errors and missing id/url yield `None`.
    #[must_use]
    pub fn image(&self) -> Option<GeneratedImage> {
        if self.error.is_some() {
            return None;
        }
        let image = GeneratedImage {
            id: self.id.clone()?,
            url: self.url.clone()?,
            prompt: self.prompt.clone(),
        };
        image.is_usable().then_some(image)
    }
}

/// Request to persist an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Canvas id of the image, reused as the saved record id
    pub id: EntityId,
    /// Source URL (`http(s)`, `data:` or local path)
    pub src: String,
    /// Prompt stored alongside the image
    pub prompt: String,
}

/// An entry of the saved-image catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedImage {
    /// Saved record id
    pub id: EntityId,
    /// Prompt of the saved image
    pub prompt: String,
    /// Fetchable URL of the stored blob
    pub url: String,
}

/// Kind of a lineage relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Target is an AI variation of the source
    Variation,
}

impl RelationshipKind {
    /// Get the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Variation => "variation",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image generation backend
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image from a prompt at a square `size`
    async fn generate_image(&self, prompt: &str, size: u32) -> Result<GeneratedImage>;

    /// Generate variations of a parent prompt.
    ///
    /// Returns one result per attempt, in slot order. Failures are reported
    /// per result; when prompt augmentation itself fails every result
    /// carries the same error.
    async fn generate_variations(
        &self,
        prompt: &str,
        parent_id: &EntityId,
        size: u32,
    ) -> Vec<VariationResult>;

    /// Backend name (for logging)
    fn name(&self) -> &str;
}

/// Durable image storage
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image and mark it saved
    async fn save_image(&self, request: SaveRequest) -> Result<()>;

    /// List saved images, newest first. Failures yield an empty list.
    async fn list_saved_images(&self) -> Vec<SavedImage>;
}

/// Lineage log written by the generation collaborator
#[async_trait]
pub trait LineageRecorder: Send + Sync {
    /// Record a freshly generated image
    async fn record_image(&self, id: &EntityId, prompt: &str) -> Result<()>;

    /// Record a directed relationship between two images
    async fn record_relationship(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: RelationshipKind,
    ) -> Result<()>;
}

/// Identifier allocation
#[async_trait]
pub trait IdGenerator: Send + Sync {
    /// Allocate a fresh unique id
    async fn new_id(&self) -> Result<EntityId>;
}

/// Allocates random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

#[async_trait]
impl IdGenerator for UuidIdGenerator {
    async fn new_id(&self) -> Result<EntityId> {
        let id = uuid::Uuid::new_v4();
        if id.is_nil() {
            return Err(Error::IdGeneration("nil uuid".to_string()));
        }
        Ok(EntityId::new(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_image_usable() {
        assert!(GeneratedImage::new("a", "https://x/a.png", "p").is_usable());
        assert!(!GeneratedImage::new("", "https://x/a.png", "p").is_usable());
        assert!(!GeneratedImage::new("a", "", "p").is_usable());
    }

    #[test]
    fn test_variation_result_image() {
        let ok = VariationResult::success(GeneratedImage::new("v1", "https://x/v1.png", "p"));
        assert_eq!(ok.image().unwrap().id.as_str(), "v1");

        let failed = VariationResult::failure("p", "boom");
        assert!(failed.is_error());
        assert!(failed.image().is_none());

        let missing_url = VariationResult {
            id: Some(EntityId::from("v2")),
            ..Default::default()
        };
        assert!(!missing_url.is_error());
        assert!(missing_url.image().is_none());
    }

    #[test]
    fn test_relationship_kind_str() {
        assert_eq!(RelationshipKind::Variation.as_str(), "variation");
        assert_eq!(RelationshipKind::Variation.to_string(), "variation");
    }

    #[tokio::test]
    async fn test_uuid_id_generator_unique() {
        let ids = UuidIdGenerator;
        let a = ids.new_id().await.unwrap();
        let b = ids.new_id().await.unwrap();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }
}
