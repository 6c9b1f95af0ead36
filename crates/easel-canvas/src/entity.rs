//! Canvas entity types
//!
//! An [`ImageEntity`] is one image slot on the canvas. Positions are in
//! canvas-local pixels and are clamped to the container [`Bounds`] whenever
//! they are set programmatically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an image entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty id is never a valid entity id
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Canvas-local pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset from the left edge
    pub x: f64,
    /// Vertical offset from the top edge
    pub y: f64,
}

impl Position {
    /// Create a position
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by the given deltas
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Container dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Container width in pixels
    pub width: f64,
    /// Container height in pixels
    pub height: f64,
}

impl Bounds {
    /// Create bounds
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Largest x an item of `item_size` may take
    #[must_use]
    pub fn max_x(&self, item_size: f64) -> f64 {
        (self.width - item_size).max(0.0)
    }

    /// Largest y an item of `item_size` may take
    #[must_use]
    pub fn max_y(&self, item_size: f64) -> f64 {
        (self.height - item_size).max(0.0)
    }

    /// Clamp a position so an item of `item_size` stays inside the container
    #[must_use]
    pub fn clamp(&self, position: Position, item_size: f64) -> Position {
        Position::new(
            position.x.clamp(0.0, self.max_x(item_size)),
            position.y.clamp(0.0, self.max_y(item_size)),
        )
    }

    /// Top-left position that centres an item of `item_size`
    #[must_use]
    pub fn center(&self, item_size: f64) -> Position {
        self.clamp(
            Position::new(
                (self.width - item_size) / 2.0,
                (self.height - item_size) / 2.0,
            ),
            item_size,
        )
    }

    /// Whether an item of `item_size` at `position` lies fully inside
    #[must_use]
    pub fn contains(&self, position: Position, item_size: f64) -> bool {
        position.x >= 0.0
            && position.y >= 0.0
            && position.x <= self.max_x(item_size)
            && position.y <= self.max_y(item_size)
    }
}

/// One image slot on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntity {
    /// Unique identifier, reassigned when a regeneration completes
    pub id: EntityId,
    /// Resolved image URL, empty until generation completes
    pub src: String,
    /// Prompt that produced (or will produce) `src`
    pub prompt: String,
    /// Top-left corner on the canvas
    pub position: Position,
    /// Entity this one was derived from (duplication or variation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    /// An async operation that will mutate this entity is in flight
    #[serde(default)]
    pub is_loading: bool,
    /// The entity has no real content yet
    #[serde(default)]
    pub is_placeholder: bool,
}

impl ImageEntity {
    /// Create an entity with resolved content
    #[must_use]
    pub fn new(
        id: impl Into<EntityId>,
        src: impl Into<String>,
        prompt: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            prompt: prompt.into(),
            position,
            parent_id: None,
            is_loading: false,
            is_placeholder: false,
        }
    }

    /// Create an empty placeholder slot
    #[must_use]
    pub fn placeholder(id: impl Into<EntityId>, position: Position) -> Self {
        Self {
            id: id.into(),
            src: String::new(),
            prompt: String::new(),
            position,
            parent_id: None,
            is_loading: false,
            is_placeholder: true,
        }
    }

    /// Record the entity this one derives from
    #[must_use]
    pub fn with_parent(mut self, parent_id: EntityId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Mark as loading
    #[must_use]
    pub fn loading(mut self) -> Self {
        self.is_loading = true;
        self
    }

    /// Whether the entity shows real generated content
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.is_placeholder && !self.src.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_empty() {
        assert!(EntityId::from("").is_empty());
        assert!(EntityId::from("   ").is_empty());
        assert!(!EntityId::from("abc").is_empty());
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = Bounds::new(800.0, 600.0);
        let clamped = bounds.clamp(Position::new(-20.0, 900.0), 150.0);
        assert_eq!(clamped, Position::new(0.0, 450.0));

        let inside = Position::new(100.0, 100.0);
        assert_eq!(bounds.clamp(inside, 150.0), inside);
    }

    #[test]
    fn test_bounds_smaller_than_item() {
        let bounds = Bounds::new(100.0, 100.0);
        assert_eq!(
            bounds.clamp(Position::new(40.0, 40.0), 150.0),
            Position::new(0.0, 0.0)
        );
    }

    #[test]
    fn test_bounds_center() {
        let bounds = Bounds::new(1000.0, 600.0);
        assert_eq!(bounds.center(200.0), Position::new(400.0, 200.0));
    }

    #[test]
    fn test_placeholder_flags() {
        let entity = ImageEntity::placeholder("p1", Position::default()).loading();
        assert!(entity.is_placeholder);
        assert!(entity.is_loading);
        assert!(!entity.has_content());
    }

    #[test]
    fn test_entity_serializes_camel_case() {
        let entity = ImageEntity::new("a", "https://img/a.png", "a cat", Position::new(1.0, 2.0))
            .with_parent(EntityId::from("root"));
        let json = serde_json::to_string(&entity).unwrap();
        assert!(json.contains("\"parentId\":\"root\""));
        assert!(json.contains("\"isLoading\":false"));
        assert!(json.contains("\"isPlaceholder\":false"));
    }
}
