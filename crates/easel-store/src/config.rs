//! Storage configuration (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Directory saved images are written to
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
    /// URL prefix the media directory is served under
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Timeout for fetching remote images, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://data/easel.db".to_string()
}
fn default_media_dir() -> PathBuf {
    PathBuf::from("data/media")
}
fn default_public_base_url() -> String {
    "/media".to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            media_dir: default_media_dir(),
            public_base_url: default_public_base_url(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl StorageConfig {
    /// Remote fetch timeout
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
