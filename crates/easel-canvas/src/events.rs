//! Canvas events
//!
//! Every applied state change is published on a broadcast channel so
//! renderers (the WebSocket surface, tests) can follow the canvas without
//! polling. Slow subscribers lag and miss events rather than blocking the
//! orchestrator.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::entity::{Bounds, EntityId, Position};

/// Something that changed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasEvent {
    /// The initial placeholder was inserted
    Mounted {
        /// Id of the placeholder
        placeholder_id: EntityId,
    },
    /// Selection moved (or was cleared)
    SelectionChanged {
        /// Newly selected entity
        selected_id: Option<EntityId>,
        /// Prompt loaded into the input
        prompt: String,
    },
    /// The live prompt was edited
    PromptChanged {
        /// Current input text
        prompt: String,
    },
    /// A regeneration started for an entity
    RegenerationStarted {
        /// Entity being regenerated
        entity_id: EntityId,
    },
    /// A regeneration replaced an entity's content
    RegenerationCompleted {
        /// Id before the regeneration
        previous_id: EntityId,
        /// Id of the new generation result
        entity_id: EntityId,
    },
    /// A regeneration failed
    RegenerationFailed {
        /// Entity that kept its old content
        entity_id: EntityId,
        /// User-visible message
        message: String,
    },
    /// Variation placeholders were inserted
    VariationsRequested {
        /// Parent entity
        parent_id: EntityId,
        /// Placeholder ids, in slot order
        placeholder_ids: Vec<EntityId>,
    },
    /// Variation results were merged back into their placeholders
    VariationsReconciled {
        /// Parent entity
        parent_id: EntityId,
        /// Placeholders promoted to real images
        succeeded: usize,
        /// Placeholders removed
        failed: usize,
        /// Aggregate error, raised only when nothing succeeded
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// An entity was added
    EntityAdded {
        /// New entity id
        entity_id: EntityId,
    },
    /// An entity was removed
    EntityRemoved {
        /// Removed entity id
        entity_id: EntityId,
    },
    /// An entity was moved
    EntityMoved {
        /// Moved entity id
        entity_id: EntityId,
        /// Clamped position
        position: Position,
    },
    /// All entities were reflowed into a grid
    GridArranged {
        /// Minimum container height for the grid
        required_height: f64,
    },
    /// The container was resized
    ContainerResized {
        /// New bounds
        bounds: Bounds,
    },
    /// A save started
    SaveStarted {
        /// Entity being saved
        entity_id: EntityId,
    },
    /// A save finished
    SaveCompleted {
        /// Entity that was saved
        entity_id: EntityId,
        /// Failure message, if the save failed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The saved-image catalog started loading
    CatalogLoading,
    /// The saved-image catalog was replaced
    CatalogUpdated {
        /// Number of saved images
        count: usize,
    },
    /// A user-visible error was raised
    ErrorRaised {
        /// Error message
        message: String,
    },
    /// The user-visible error was cleared
    ErrorCleared,
}

impl CanvasEvent {
    /// Get the event type as a string
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Mounted { .. } => "mounted",
            Self::SelectionChanged { .. } => "selection_changed",
            Self::PromptChanged { .. } => "prompt_changed",
            Self::RegenerationStarted { .. } => "regeneration_started",
            Self::RegenerationCompleted { .. } => "regeneration_completed",
            Self::RegenerationFailed { .. } => "regeneration_failed",
            Self::VariationsRequested { .. } => "variations_requested",
            Self::VariationsReconciled { .. } => "variations_reconciled",
            Self::EntityAdded { .. } => "entity_added",
            Self::EntityRemoved { .. } => "entity_removed",
            Self::EntityMoved { .. } => "entity_moved",
            Self::GridArranged { .. } => "grid_arranged",
            Self::ContainerResized { .. } => "container_resized",
            Self::SaveStarted { .. } => "save_started",
            Self::SaveCompleted { .. } => "save_completed",
            Self::CatalogLoading => "catalog_loading",
            Self::CatalogUpdated { .. } => "catalog_updated",
            Self::ErrorRaised { .. } => "error_raised",
            Self::ErrorCleared => "error_cleared",
        }
    }
}

/// Broadcast channel for canvas events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CanvasEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CanvasEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, event: CanvasEvent) -> usize {
        // no receivers is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of active subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
