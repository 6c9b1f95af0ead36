//! Generation configuration
//!
//! Read from the `[generation]` config section; the API key only ever comes
//! from the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::mask_api_key;

/// OpenAI-compatible API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default image model
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// Default chat model for prompt variation
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Generation backend configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API key
    #[serde(skip)]
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used for image generation
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Model used to rewrite prompts into variations
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}
fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            image_model: default_image_model(),
            chat_model: default_chat_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("image_model", &self.image_model)
            .field("chat_model", &self.chat_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a configuration with default endpoints
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.load_api_key()?;
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("EASEL_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Ok(model) = std::env::var("EASEL_CHAT_MODEL") {
            config.chat_model = model;
        }
        Ok(config)
    }

    /// Fill the API key from the environment unless one is already set
    pub fn load_api_key(&mut self) -> Result<()> {
        if !self.api_key.is_empty() {
            return Ok(());
        }
        self.api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::NotConfigured(format!("{API_KEY_ENV} not set")))?;
        Ok(())
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
