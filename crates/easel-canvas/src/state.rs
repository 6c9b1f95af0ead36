//! Canvas state and its reducer
//!
//! [`CanvasState`] is the single source of truth for the canvas. It is only
//! changed through [`CanvasState::apply`], one [`Action`] at a time, so every
//! read-modify-write runs against the latest collection rather than a copy
//! captured before an await point.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

use crate::capability::{GeneratedImage, SavedImage, VariationResult};
use crate::entity::{Bounds, EntityId, ImageEntity, Position};
use crate::events::CanvasEvent;
use crate::layout::GridLayout;

/// Id of the placeholder inserted on first mount
pub const INITIAL_PLACEHOLDER_ID: &str = "initial-placeholder";

/// Number of variation slots opened around a parent
pub const VARIATION_SLOTS: usize = 4;

/// Correlation token for one variation request.
///
/// Minted when the placeholders are inserted; the placeholder ids are derived
/// from it so results can be routed back without relying on array layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchToken(Uuid);

impl BatchToken {
    /// Mint a fresh token
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic placeholder id for slot `index`
    #[must_use]
    pub fn slot_id(&self, index: usize) -> EntityId {
        EntityId::new(format!("variation-{}-{}", self.0, index))
    }
}

impl Default for BatchToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Regeneration latch. At most one regeneration runs across the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RegenerationState {
    /// Nothing in flight
    #[default]
    Idle,
    /// A regeneration is in flight
    Pending {
        /// Entity being regenerated
        entity_id: EntityId,
        /// Prompt sent to the generator
        prompt: String,
    },
}

impl RegenerationState {
    /// Whether a regeneration is in flight
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

#[derive(Debug, Clone)]
struct VariationBatch {
    parent_id: EntityId,
    slots: Vec<EntityId>,
}

/// A state transition
#[derive(Debug, Clone)]
pub enum Action {
    /// Insert the initial placeholder if the canvas was never mounted and is empty
    Mount {
        /// Placeholder to insert
        placeholder: ImageEntity,
    },
    /// Select an entity and load its prompt (no-op while regenerating)
    Select(EntityId),
    /// Clear selection and prompt
    Deselect,
    /// Edit the live prompt
    SetPrompt(String),
    /// Clear the user-visible error
    ClearError,
    /// Raise a user-visible error
    RaiseError(String),
    /// Take the regeneration latch for an entity
    BeginRegeneration {
        /// Target entity
        entity_id: EntityId,
        /// Prompt being generated
        prompt: String,
    },
    /// Replace the target's content with a new generation result
    CompleteRegeneration {
        /// Target entity
        entity_id: EntityId,
        /// Generation result
        image: GeneratedImage,
    },
    /// Release the latch after a failed regeneration
    FailRegeneration {
        /// Target entity
        entity_id: EntityId,
        /// User-visible message
        message: String,
    },
    /// Insert variation placeholders and register their batch
    RequestVariations {
        /// Correlation token
        token: BatchToken,
        /// Parent entity
        parent_id: EntityId,
        /// Placeholders, in slot order
        placeholders: Vec<ImageEntity>,
    },
    /// Merge variation results into the batch's placeholders
    ReconcileVariations {
        /// Correlation token
        token: BatchToken,
        /// Results, in slot order
        results: Vec<VariationResult>,
    },
    /// Drop a batch's placeholders after an unexpected failure
    AbortVariations {
        /// Correlation token
        token: BatchToken,
        /// User-visible message
        message: String,
    },
    /// Add a new entity
    Insert(ImageEntity),
    /// Remove an entity
    Remove(EntityId),
    /// Move an entity (position is clamped)
    Move {
        /// Entity to move
        entity_id: EntityId,
        /// Requested position
        position: Position,
    },
    /// Change the container size
    Resize(Bounds),
    /// Reflow every entity into a grid
    ArrangeGrid,
    /// Mark an entity as being saved
    BeginSave(EntityId),
    /// Clear the saving mark
    FinishSave {
        /// Saved entity
        entity_id: EntityId,
        /// Failure message, if any
        error: Option<String>,
    },
    /// Mark the catalog as loading
    BeginCatalogLoad,
    /// Replace the catalog wholesale
    CatalogLoaded(Vec<SavedImage>),
    /// Insert a saved image, replacing an entity with the same id
    PlaceSaved(ImageEntity),
}

/// Render-ready view of the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSnapshot {
    /// Entities in insertion order
    pub entities: Vec<ImageEntity>,
    /// Selected entity
    pub selected_id: Option<EntityId>,
    /// Live prompt input
    pub prompt: String,
    /// Most recent user-visible error
    pub error: Option<String>,
    /// Regeneration latch
    pub regeneration: RegenerationState,
    /// Saved-image catalog
    pub saved_catalog: Vec<SavedImage>,
    /// Whether the catalog is loading
    pub catalog_loading: bool,
    /// Entities with a save in flight
    pub saving: Vec<EntityId>,
    /// Container bounds
    pub container: Bounds,
    /// Height needed by the last grid arrangement
    pub content_height: f64,
}

/// The canvas
#[derive(Debug, Clone)]
pub struct CanvasState {
    entities: Vec<ImageEntity>,
    selected: Option<EntityId>,
    prompt: String,
    error: Option<String>,
    regeneration: RegenerationState,
    variations: HashMap<BatchToken, VariationBatch>,
    catalog: Vec<SavedImage>,
    catalog_loading: bool,
    saving: BTreeSet<EntityId>,
    bounds: Bounds,
    content_height: f64,
    item_size: f64,
    grid: GridLayout,
    mounted: bool,
}

impl CanvasState {
    /// Create an empty, unmounted canvas
    #[must_use]
    pub fn new(bounds: Bounds, grid: GridLayout) -> Self {
        Self {
            entities: Vec::new(),
            selected: None,
            prompt: String::new(),
            error: None,
            regeneration: RegenerationState::Idle,
            variations: HashMap::new(),
            catalog: Vec::new(),
            catalog_loading: false,
            saving: BTreeSet::new(),
            bounds,
            content_height: bounds.height,
            item_size: grid.item_size,
            grid,
            mounted: false,
        }
    }

    /// Entities in insertion order
    #[must_use]
    pub fn entities(&self) -> &[ImageEntity] {
        &self.entities
    }

    /// Look up an entity
    #[must_use]
    pub fn entity(&self, id: &EntityId) -> Option<&ImageEntity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    /// Whether an entity with this id exists
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entity(id).is_some()
    }

    /// Selected entity id
    #[must_use]
    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    /// Live prompt
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Current user-visible error
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Regeneration latch
    #[must_use]
    pub fn regeneration(&self) -> &RegenerationState {
        &self.regeneration
    }

    /// Container bounds
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Saved-image catalog
    #[must_use]
    pub fn catalog(&self) -> &[SavedImage] {
        &self.catalog
    }

    /// Look up a catalog entry
    #[must_use]
    pub fn catalog_entry(&self, id: &EntityId) -> Option<&SavedImage> {
        self.catalog.iter().find(|s| &s.id == id)
    }

    /// Number of variation batches awaiting results
    #[must_use]
    pub fn pending_variation_batches(&self) -> usize {
        self.variations.len()
    }

    /// Whether a save is in flight for this entity
    #[must_use]
    pub fn is_saving(&self, id: &EntityId) -> bool {
        self.saving.contains(id)
    }

    /// Entity to regenerate when the debounced prompt settles on `debounced`.
    ///
    /// Requires a selection, a non-blank prompt, an idle latch and a prompt
    /// that differs from what the selected entity already shows.
    #[must_use]
    pub fn regeneration_target(&self, debounced: &str) -> Option<EntityId> {
        let selected = self.selected.as_ref()?;
        if debounced.trim().is_empty() || self.regeneration.is_pending() {
            return None;
        }
        let entity = self.entity(selected)?;
        (entity.prompt != debounced).then(|| entity.id.clone())
    }

    /// Render-ready copy of the state
    #[must_use]
    pub fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            entities: self.entities.clone(),
            selected_id: self.selected.clone(),
            prompt: self.prompt.clone(),
            error: self.error.clone(),
            regeneration: self.regeneration.clone(),
            saved_catalog: self.catalog.clone(),
            catalog_loading: self.catalog_loading,
            saving: self.saving.iter().cloned().collect(),
            container: self.bounds,
            content_height: self.content_height,
        }
    }

    /// Apply an action. Returns the resulting event, or `None` when the
    /// action was a no-op.
    pub fn apply(&mut self, action: Action) -> Option<CanvasEvent> {
        match action {
            Action::Mount { placeholder } => self.mount(placeholder),
            Action::Select(id) => self.select(id),
            Action::Deselect => Some(self.deselect()),
            Action::SetPrompt(prompt) => {
                self.prompt.clone_from(&prompt);
                Some(CanvasEvent::PromptChanged { prompt })
            }
            Action::ClearError => self.error.take().map(|_| CanvasEvent::ErrorCleared),
            Action::RaiseError(message) => Some(self.raise(message)),
            Action::BeginRegeneration { entity_id, prompt } => {
                self.begin_regeneration(entity_id, prompt)
            }
            Action::CompleteRegeneration { entity_id, image } => {
                self.complete_regeneration(entity_id, image)
            }
            Action::FailRegeneration { entity_id, message } => {
                self.regeneration = RegenerationState::Idle;
                if let Some(entity) = self.entity_mut(&entity_id) {
                    entity.is_loading = false;
                }
                self.error = Some(message.clone());
                Some(CanvasEvent::RegenerationFailed { entity_id, message })
            }
            Action::RequestVariations {
                token,
                parent_id,
                placeholders,
            } => self.request_variations(token, parent_id, placeholders),
            Action::ReconcileVariations { token, results } => {
                self.reconcile_variations(token, results)
            }
            Action::AbortVariations { token, message } => {
                let batch = self.variations.remove(&token)?;
                let removed = self.remove_slots(&batch.slots);
                self.error = Some(message.clone());
                Some(CanvasEvent::VariationsReconciled {
                    parent_id: batch.parent_id,
                    succeeded: 0,
                    failed: removed,
                    error: Some(message),
                })
            }
            Action::Insert(entity) => {
                if self.contains(&entity.id) {
                    return None;
                }
                let entity_id = entity.id.clone();
                self.entities.push(entity);
                Some(CanvasEvent::EntityAdded { entity_id })
            }
            Action::Remove(id) => self.remove(&id),
            Action::Move {
                entity_id,
                position,
            } => {
                let position = self.bounds.clamp(position, self.item_size);
                let entity = self.entity_mut(&entity_id)?;
                entity.position = position;
                Some(CanvasEvent::EntityMoved {
                    entity_id,
                    position,
                })
            }
            Action::Resize(bounds) => {
                self.bounds = bounds;
                self.content_height = self.content_height.max(bounds.height);
                Some(CanvasEvent::ContainerResized { bounds })
            }
            Action::ArrangeGrid => {
                let arranged = self
                    .grid
                    .arrange(std::mem::take(&mut self.entities), self.bounds.width);
                self.entities = arranged.entities;
                self.content_height = arranged.required_height;
                self.selected = None;
                self.prompt.clear();
                Some(CanvasEvent::GridArranged {
                    required_height: arranged.required_height,
                })
            }
            Action::BeginSave(entity_id) => {
                self.saving.insert(entity_id.clone());
                Some(CanvasEvent::SaveStarted { entity_id })
            }
            Action::FinishSave { entity_id, error } => {
                self.saving.remove(&entity_id);
                if let Some(message) = &error {
                    self.error = Some(message.clone());
                }
                Some(CanvasEvent::SaveCompleted { entity_id, error })
            }
            Action::BeginCatalogLoad => {
                self.catalog_loading = true;
                Some(CanvasEvent::CatalogLoading)
            }
            Action::CatalogLoaded(catalog) => {
                self.catalog = catalog;
                self.catalog_loading = false;
                Some(CanvasEvent::CatalogUpdated {
                    count: self.catalog.len(),
                })
            }
            Action::PlaceSaved(entity) => {
                let entity_id = entity.id.clone();
                match self.entity_mut(&entity_id) {
                    Some(existing) => *existing = entity,
                    None => self.entities.push(entity),
                }
                Some(CanvasEvent::EntityAdded { entity_id })
            }
        }
    }

    fn entity_mut(&mut self, id: &EntityId) -> Option<&mut ImageEntity> {
        self.entities.iter_mut().find(|e| &e.id == id)
    }

    fn raise(&mut self, message: String) -> CanvasEvent {
        self.error = Some(message.clone());
        CanvasEvent::ErrorRaised { message }
    }

    fn mount(&mut self, placeholder: ImageEntity) -> Option<CanvasEvent> {
        let first = !self.mounted;
        self.mounted = true;
        if !first || !self.entities.is_empty() {
            return None;
        }
        let placeholder_id = placeholder.id.clone();
        self.entities.push(placeholder);
        self.selected = Some(placeholder_id.clone());
        self.prompt.clear();
        Some(CanvasEvent::Mounted { placeholder_id })
    }

    fn select(&mut self, id: EntityId) -> Option<CanvasEvent> {
        if self.regeneration.is_pending() {
            return None;
        }
        let prompt = self.entity(&id)?.prompt.clone();
        self.prompt.clone_from(&prompt);
        self.selected = Some(id.clone());
        Some(CanvasEvent::SelectionChanged {
            selected_id: Some(id),
            prompt,
        })
    }

    fn deselect(&mut self) -> CanvasEvent {
        self.selected = None;
        self.prompt.clear();
        CanvasEvent::SelectionChanged {
            selected_id: None,
            prompt: String::new(),
        }
    }

    fn begin_regeneration(&mut self, entity_id: EntityId, prompt: String) -> Option<CanvasEvent> {
        if self.regeneration.is_pending() {
            return None;
        }
        self.entity_mut(&entity_id)?.is_loading = true;
        self.error = None;
        self.regeneration = RegenerationState::Pending {
            entity_id: entity_id.clone(),
            prompt,
        };
        Some(CanvasEvent::RegenerationStarted { entity_id })
    }

    fn complete_regeneration(
        &mut self,
        entity_id: EntityId,
        image: GeneratedImage,
    ) -> Option<CanvasEvent> {
        self.regeneration = RegenerationState::Idle;

        if image.id != entity_id && self.contains(&image.id) {
            if let Some(entity) = self.entity_mut(&entity_id) {
                entity.is_loading = false;
            }
            let message = format!("Failed to generate image: duplicate image id {}", image.id);
            self.error = Some(message.clone());
            return Some(CanvasEvent::RegenerationFailed { entity_id, message });
        }

        let new_id = image.id.clone();
        let entity = self.entity_mut(&entity_id)?;
        entity.id = image.id;
        entity.src = image.url;
        entity.prompt = image.prompt;
        entity.is_loading = false;
        entity.is_placeholder = false;

        if self.selected.as_ref() == Some(&entity_id) {
            self.selected = Some(new_id.clone());
        }
        Some(CanvasEvent::RegenerationCompleted {
            previous_id: entity_id,
            entity_id: new_id,
        })
    }

    fn request_variations(
        &mut self,
        token: BatchToken,
        parent_id: EntityId,
        placeholders: Vec<ImageEntity>,
    ) -> Option<CanvasEvent> {
        let mut slots = Vec::with_capacity(placeholders.len());
        for placeholder in placeholders {
            if self.contains(&placeholder.id) {
                continue;
            }
            slots.push(placeholder.id.clone());
            self.entities.push(placeholder);
        }
        self.variations.insert(
            token,
            VariationBatch {
                parent_id: parent_id.clone(),
                slots: slots.clone(),
            },
        );
        Some(CanvasEvent::VariationsRequested {
            parent_id,
            placeholder_ids: slots,
        })
    }

    fn reconcile_variations(
        &mut self,
        token: BatchToken,
        results: Vec<VariationResult>,
    ) -> Option<CanvasEvent> {
        // unknown token: the batch was already aborted
        let batch = self.variations.remove(&token)?;

        let mut succeeded = 0;
        let mut failed = 0;
        let mut first_error: Option<String> = None;

        for (slot, result) in batch.slots.iter().zip(results.iter()) {
            if result.is_error() && first_error.is_none() {
                first_error.clone_from(&result.error);
            }
            let Some(index) = self.entities.iter().position(|e| &e.id == slot) else {
                // placeholder deleted while in flight
                continue;
            };
            match result.image() {
                Some(image) if image.id == *slot || !self.contains(&image.id) => {
                    let entity = &mut self.entities[index];
                    entity.id = image.id;
                    entity.src = image.url;
                    entity.prompt = image.prompt;
                    entity.is_loading = false;
                    entity.is_placeholder = false;
                    succeeded += 1;
                }
                _ => {
                    self.entities.remove(index);
                    failed += 1;
                }
            }
        }

        // slots the generator returned no result for
        if batch.slots.len() > results.len() {
            failed += self.remove_slots(&batch.slots[results.len()..]);
        }

        let mut error = None;
        if succeeded == 0 {
            failed += self.remove_slots(&batch.slots);
            if let Some(reason) = first_error {
                let message = format!("Failed to generate variations: {reason}");
                self.error = Some(message.clone());
                error = Some(message);
            }
        }

        Some(CanvasEvent::VariationsReconciled {
            parent_id: batch.parent_id,
            succeeded,
            failed,
            error,
        })
    }

    fn remove_slots(&mut self, slots: &[EntityId]) -> usize {
        let before = self.entities.len();
        self.entities
            .retain(|e| !(e.is_placeholder && slots.contains(&e.id)));
        if let Some(selected) = &self.selected {
            if slots.contains(selected) && !self.contains(selected) {
                self.deselect();
            }
        }
        before - self.entities.len()
    }

    fn remove(&mut self, id: &EntityId) -> Option<CanvasEvent> {
        let index = self.entities.iter().position(|e| &e.id == id)?;
        self.entities.remove(index);
        self.saving.remove(id);
        if self.selected.as_ref() == Some(id) {
            self.deselect();
        }
        Some(CanvasEvent::EntityRemoved {
            entity_id: id.clone(),
        })
    }
}
