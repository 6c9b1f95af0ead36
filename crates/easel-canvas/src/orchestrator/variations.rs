//! Variation placeholders and reconciliation

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::core::CanvasOrchestrator;
use super::helpers::guarded;
use super::types::VariationReport;
use crate::entity::{EntityId, ImageEntity};
use crate::error::{Error, Result};
use crate::events::CanvasEvent;
use crate::layout::variation_positions;
use crate::state::{Action, BatchToken};

impl CanvasOrchestrator {
    /// Generate variations of an entity.
    ///
    /// Four loading placeholders are placed above, below, left of and right
    /// of the parent straight away. When the generator answers, each result
    /// is merged into the slot it was requested for: successes become real
    /// images parented to `parent_id`, failures drop their placeholder. If
    /// nothing succeeded and at least one attempt reported an error, the
    /// first error is raised on the canvas and returned.
    #[instrument(skip(self, parent_prompt), fields(parent_id = %parent_id))]
    pub async fn generate_variations(
        &self,
        parent_id: &EntityId,
        parent_prompt: &str,
    ) -> Result<VariationReport> {
        let token = BatchToken::new();
        {
            let mut state = self.state.write().await;
            self.commit(&mut state, Action::ClearError);
            let Some(parent) = state.entity(parent_id).cloned() else {
                return Err(self.raise(&mut state, Error::EntityNotFound(parent_id.clone())));
            };
            let bounds = state.bounds();
            let placeholders = variation_positions(
                parent.position,
                self.config.item_size,
                self.config.gap,
                &bounds,
            )
            .into_iter()
            .enumerate()
            .map(|(slot, position)| {
                ImageEntity::placeholder(token.slot_id(slot), position)
                    .with_parent(parent.id.clone())
                    .loading()
            })
            .collect();
            self.commit(
                &mut state,
                Action::RequestVariations {
                    token,
                    parent_id: parent.id,
                    placeholders,
                },
            );
        }

        info!(batch = %token, "requesting variations");
        let generator = Arc::clone(&self.generator);
        let prompt = parent_prompt.to_string();
        let parent = parent_id.clone();
        let size = self.config.image_size;
        let results = guarded(async move {
            Ok(generator.generate_variations(&prompt, &parent, size).await)
        })
        .await;

        let mut state = self.state.write().await;
        let results = match results {
            Ok(results) => results,
            Err(err) => {
                let message = format!("Failed to generate variations: {err}");
                warn!(batch = %token, %message, "variation request aborted");
                self.commit(&mut state, Action::AbortVariations { token, message });
                return Err(err);
            }
        };

        match self.commit(&mut state, Action::ReconcileVariations { token, results }) {
            Some(CanvasEvent::VariationsReconciled {
                succeeded,
                failed,
                error,
                ..
            }) => {
                info!(batch = %token, succeeded, failed, "variations reconciled");
                match error {
                    Some(message) => Err(Error::Upstream(message)),
                    None => Ok(VariationReport { succeeded, failed }),
                }
            }
            _ => Ok(VariationReport::default()),
        }
    }
}
