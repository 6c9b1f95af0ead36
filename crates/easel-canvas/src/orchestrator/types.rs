//! Operation outcomes

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// What happened when the debounced prompt settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegenerationOutcome {
    /// No regeneration was due (no selection, blank or unchanged prompt, or
    /// another regeneration in flight)
    Skipped,
    /// The entity's content was replaced
    Regenerated {
        /// Id before the regeneration
        previous_id: EntityId,
        /// Id after the regeneration
        entity_id: EntityId,
    },
    /// Generation failed; the entity kept its previous content
    Failed {
        /// Target entity
        entity_id: EntityId,
        /// User-visible message
        message: String,
    },
    /// The target was removed while the generation was in flight
    Discarded {
        /// Target entity
        entity_id: EntityId,
    },
}

impl RegenerationOutcome {
    /// Whether the entity was regenerated
    #[must_use]
    pub fn is_regenerated(&self) -> bool {
        matches!(self, Self::Regenerated { .. })
    }
}

/// Result of one variation request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationReport {
    /// Placeholders promoted to images
    pub succeeded: usize,
    /// Placeholders removed
    pub failed: usize,
}
