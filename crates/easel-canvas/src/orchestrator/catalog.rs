//! Saving and the saved-image catalog

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::core::CanvasOrchestrator;
use super::helpers::guarded;
use crate::capability::{SaveRequest, SavedImage};
use crate::entity::{EntityId, ImageEntity};
use crate::error::{Error, Result};
use crate::state::{Action, CanvasState};

impl CanvasOrchestrator {
    /// Persist an image, then refresh the saved catalog.
    ///
    /// The entity is marked as saving for the duration of the call. The
    /// catalog is refreshed whether or not the save succeeded.
    #[instrument(skip(self, src), fields(entity_id = %id))]
    pub async fn save(&self, id: &EntityId, src: &str) -> Result<()> {
        let prompt = {
            let mut state = self.state.write().await;
            self.commit(&mut state, Action::ClearError);
            self.commit(&mut state, Action::BeginSave(id.clone()));
            state.entity(id).map(|e| e.prompt.clone()).unwrap_or_default()
        };

        let result = if src.trim().is_empty() {
            Err(Error::InvalidInput("image has no source to save".to_string()))
        } else {
            let store = Arc::clone(&self.store);
            let request = SaveRequest {
                id: id.clone(),
                src: src.to_string(),
                prompt,
            };
            guarded(async move { store.save_image(request).await }).await
        };

        {
            let mut state = self.state.write().await;
            let error = match &result {
                Ok(()) => {
                    info!("image saved");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "save failed");
                    Some(format!("Failed to save image: {e}"))
                }
            };
            self.commit(
                &mut state,
                Action::FinishSave {
                    entity_id: id.clone(),
                    error,
                },
            );
        }

        self.load_saved_catalog().await;
        result
    }

    /// Replace the catalog with the store's current listing.
    ///
    /// A failing store yields an empty catalog. Returns the entry count.
    pub async fn load_saved_catalog(&self) -> usize {
        {
            let mut state = self.state.write().await;
            self.commit(&mut state, Action::BeginCatalogLoad);
        }

        let store = Arc::clone(&self.store);
        let catalog = guarded(async move { Ok(store.list_saved_images().await) })
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "listing saved images failed");
                Vec::new()
            });
        let count = catalog.len();

        let mut state = self.state.write().await;
        self.commit(&mut state, Action::CatalogLoaded(catalog));
        count
    }

    /// Place a saved image at the container centre and select it.
    ///
    /// An entity with the same id is replaced instead of duplicated.
    pub async fn place_saved_image(&self, saved: SavedImage) -> Result<EntityId> {
        let mut state = self.state.write().await;
        self.place_saved_locked(&mut state, saved)
    }

    /// Place a catalog entry by id
    pub async fn place_saved_by_id(&self, id: &EntityId) -> Result<EntityId> {
        let mut state = self.state.write().await;
        let Some(saved) = state.catalog_entry(id).cloned() else {
            self.commit(&mut state, Action::ClearError);
            return Err(self.raise(&mut state, Error::SavedImageNotFound(id.clone())));
        };
        self.place_saved_locked(&mut state, saved)
    }

    fn place_saved_locked(&self, state: &mut CanvasState, saved: SavedImage) -> Result<EntityId> {
        self.commit(state, Action::ClearError);
        if saved.id.is_empty() || saved.url.trim().is_empty() {
            let err = Error::InvalidInput("saved image has no id or url".to_string());
            return Err(self.raise(state, err));
        }

        let position = state.bounds().center(self.config.item_size);
        let id = saved.id.clone();
        let entity = ImageEntity::new(saved.id, saved.url, saved.prompt, position);
        self.commit(state, Action::PlaceSaved(entity));
        if self.commit(state, Action::Select(id.clone())).is_some() {
            self.sync_prompt(state);
        }
        info!(entity_id = %id, "saved image placed");
        Ok(id)
    }
}
