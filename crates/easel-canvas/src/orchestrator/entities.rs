//! Duplicate, delete, move, resize and grid arrangement

use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::core::CanvasOrchestrator;
use super::helpers::guarded;
use crate::entity::{Bounds, EntityId, ImageEntity, Position};
use crate::error::{Error, Result};
use crate::events::CanvasEvent;
use crate::layout::duplicate_position;
use crate::state::Action;

impl CanvasOrchestrator {
    /// Copy an entity next to itself under a fresh id and select the copy.
    ///
    /// The copy shares the source's image and prompt and records the source
    /// as its parent.
    #[instrument(skip(self), fields(source_id = %source_id))]
    pub async fn duplicate(&self, source_id: &EntityId) -> Result<EntityId> {
        {
            let mut state = self.state.write().await;
            self.commit(&mut state, Action::ClearError);
            if !state.contains(source_id) {
                return Err(self.raise(&mut state, Error::EntityNotFound(source_id.clone())));
            }
        }

        let ids = Arc::clone(&self.ids);
        let allocated = guarded(async move { ids.new_id().await }).await;

        let mut state = self.state.write().await;
        let new_id = match allocated {
            Ok(id) if !id.is_empty() => id,
            Ok(_) => {
                let err = Error::IdGeneration("empty id".to_string());
                return Err(self.raise(&mut state, err));
            }
            Err(Error::IdGeneration(reason)) => {
                return Err(self.raise(&mut state, Error::IdGeneration(reason)));
            }
            Err(e) => {
                return Err(self.raise(&mut state, Error::IdGeneration(e.to_string())));
            }
        };
        if state.contains(&new_id) {
            return Err(self.raise(&mut state, Error::DuplicateId(new_id)));
        }
        // the source may have been deleted or regenerated meanwhile
        let Some(source) = state.entity(source_id).cloned() else {
            return Err(self.raise(&mut state, Error::EntityNotFound(source_id.clone())));
        };

        let position = duplicate_position(
            source.position,
            self.config.item_size,
            self.config.duplicate_offset,
            &state.bounds(),
        );
        let copy = ImageEntity::new(new_id.clone(), source.src, source.prompt, position)
            .with_parent(source.id);
        self.commit(&mut state, Action::Insert(copy));
        if self
            .commit(&mut state, Action::Select(new_id.clone()))
            .is_some()
        {
            self.sync_prompt(&state);
        }
        info!(%new_id, "image duplicated");
        Ok(new_id)
    }

    /// Remove an entity. Deleting the selection clears selection and prompt.
    pub async fn delete(&self, id: &EntityId) -> Result<()> {
        let mut state = self.state.write().await;
        self.commit(&mut state, Action::ClearError);
        let was_selected = state.selected() == Some(id);
        if self.commit(&mut state, Action::Remove(id.clone())).is_none() {
            return Err(self.raise(&mut state, Error::EntityNotFound(id.clone())));
        }
        if was_selected {
            self.sync_prompt(&state);
        }
        debug!(entity_id = %id, "image deleted");
        Ok(())
    }

    /// Move an entity; returns the position after clamping to the container
    pub async fn move_entity(&self, id: &EntityId, position: Position) -> Result<Position> {
        let mut state = self.state.write().await;
        self.commit(&mut state, Action::ClearError);
        let moved = self.commit(
            &mut state,
            Action::Move {
                entity_id: id.clone(),
                position,
            },
        );
        match (moved, state.entity(id)) {
            (Some(_), Some(entity)) => Ok(entity.position),
            _ => Err(self.raise(&mut state, Error::EntityNotFound(id.clone()))),
        }
    }

    /// Change the container size used for clamping and grid layout
    pub async fn resize_container(&self, width: f64, height: f64) -> Result<Bounds> {
        let mut state = self.state.write().await;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            let err = Error::InvalidInput(format!("container size {width}x{height}"));
            return Err(self.raise(&mut state, err));
        }
        let bounds = Bounds::new(width, height);
        self.commit(&mut state, Action::Resize(bounds));
        Ok(bounds)
    }

    /// Reflow every entity into a centred grid and clear the selection.
    ///
    /// Returns the container height the grid needs.
    pub async fn arrange_grid(&self) -> f64 {
        let mut state = self.state.write().await;
        self.commit(&mut state, Action::ClearError);
        let height = match self.commit(&mut state, Action::ArrangeGrid) {
            Some(CanvasEvent::GridArranged { required_height }) => required_height,
            _ => state.bounds().height,
        };
        self.sync_prompt(&state);
        info!(entities = state.entities().len(), height, "grid arranged");
        height
    }
}
