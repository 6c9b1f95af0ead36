//! Canvas configuration
//!
//! Exposed to TOML under `[canvas]`. Every field has a default so a partial
//! section is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::entity::Bounds;
use crate::layout::GridLayout;

/// Canvas configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Rendered edge length of one image, in pixels
    #[serde(default = "default_item_size")]
    pub item_size: f64,
    /// Gap between images in grids and around variations
    #[serde(default = "default_gap")]
    pub gap: f64,
    /// Extra horizontal offset for duplicates, on top of `item_size`
    #[serde(default = "default_duplicate_offset")]
    pub duplicate_offset: f64,
    /// Space reserved above the grid for the prompt header
    #[serde(default = "default_header_height")]
    pub header_height: f64,
    /// Initial container width
    #[serde(default = "default_width")]
    pub width: f64,
    /// Initial container height
    #[serde(default = "default_height")]
    pub height: f64,
    /// Delay before a prompt edit triggers regeneration
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Square size requested from the generation backend
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    /// Capacity of the canvas event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_item_size() -> f64 {
    150.0
}
fn default_gap() -> f64 {
    20.0
}
fn default_duplicate_offset() -> f64 {
    25.0
}
fn default_header_height() -> f64 {
    80.0
}
fn default_width() -> f64 {
    1200.0
}
fn default_height() -> f64 {
    800.0
}
fn default_debounce_ms() -> u64 {
    800
}
fn default_image_size() -> u32 {
    1024
}
fn default_event_capacity() -> usize {
    256
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            item_size: default_item_size(),
            gap: default_gap(),
            duplicate_offset: default_duplicate_offset(),
            header_height: default_header_height(),
            width: default_width(),
            height: default_height(),
            debounce_ms: default_debounce_ms(),
            image_size: default_image_size(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl CanvasConfig {
    /// Initial container bounds
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    /// Grid parameters derived from this config
    #[must_use]
    pub fn grid(&self) -> GridLayout {
        GridLayout {
            item_size: self.item_size,
            gap: self.gap,
            header_height: self.header_height,
        }
    }

    /// Debounce delay
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Set the container size
    #[must_use]
    pub fn with_bounds(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the debounce delay
    #[must_use]
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CanvasConfig::default();
        assert_eq!(config.item_size, 150.0);
        assert_eq!(config.duplicate_offset, 25.0);
        assert_eq!(config.debounce(), Duration::from_millis(800));
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: CanvasConfig = serde_json::from_str(r#"{"gap": 10.0}"#).unwrap();
        assert_eq!(config.gap, 10.0);
        assert_eq!(config.item_size, 150.0);
        assert_eq!(config.image_size, 1024);
    }
}
