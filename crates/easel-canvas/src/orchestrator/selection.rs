//! Mount, selection, prompt editing and debounced regeneration

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::core::CanvasOrchestrator;
use super::helpers::guarded;
use super::types::RegenerationOutcome;
use crate::entity::{EntityId, ImageEntity};
use crate::error::{Error, Result};
use crate::events::CanvasEvent;
use crate::state::{Action, CanvasState, INITIAL_PLACEHOLDER_ID};

impl CanvasOrchestrator {
    /// Insert a centred placeholder and select it.
    ///
    /// Only the first mount of an empty canvas does anything; returns whether
    /// the placeholder was inserted.
    pub async fn mount(&self) -> bool {
        let mut state = self.state.write().await;
        let position = state.bounds().center(self.config.item_size);
        let placeholder = ImageEntity::placeholder(INITIAL_PLACEHOLDER_ID, position);
        let mounted = self
            .commit(&mut state, Action::Mount { placeholder })
            .is_some();
        if mounted {
            info!("canvas mounted with initial placeholder");
            self.sync_prompt(&state);
        }
        mounted
    }

    /// Select an entity and load its prompt into the input.
    ///
    /// Ignored (returns `Ok(false)`) while a regeneration is in flight.
    pub async fn select_entity(&self, id: &EntityId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.regeneration().is_pending() {
            debug!(entity_id = %id, "selection ignored during regeneration");
            return Ok(false);
        }
        if !state.contains(id) {
            return Err(self.raise(&mut state, Error::EntityNotFound(id.clone())));
        }
        self.commit(&mut state, Action::ClearError);
        self.commit(&mut state, Action::Select(id.clone()));
        self.sync_prompt(&state);
        Ok(true)
    }

    /// Clear selection and prompt
    pub async fn deselect(&self) {
        let mut state = self.state.write().await;
        self.commit(&mut state, Action::ClearError);
        self.commit(&mut state, Action::Deselect);
        self.sync_prompt(&state);
    }

    /// Edit the live prompt; the debounced value follows after the delay
    pub async fn update_prompt(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.state.write().await;
        self.commit(&mut state, Action::SetPrompt(text.clone()));
        self.prompt.set(text);
    }

    /// React to a settled prompt value.
    ///
    /// Regenerates the selected entity when the prompt is non-blank, differs
    /// from the entity's prompt, and no other regeneration is in flight.
    /// A value that no longer matches the prompt input (a selection or a
    /// newer edit replaced it before the settle ran) is skipped.
    #[instrument(skip(self))]
    pub async fn on_prompt_settled(&self, debounced: &str) -> RegenerationOutcome {
        let target = {
            let mut state = self.state.write().await;
            if state.prompt() != debounced {
                debug!(current = state.prompt(), "stale prompt settle ignored");
                return RegenerationOutcome::Skipped;
            }
            let Some(target) = state.regeneration_target(debounced) else {
                return RegenerationOutcome::Skipped;
            };
            let started = self.commit(
                &mut state,
                Action::BeginRegeneration {
                    entity_id: target.clone(),
                    prompt: debounced.to_string(),
                },
            );
            if started.is_none() {
                return RegenerationOutcome::Skipped;
            }
            target
        };

        info!(entity_id = %target, generator = self.generator.name(), "regenerating image");
        let generator = Arc::clone(&self.generator);
        let prompt = debounced.to_string();
        let size = self.config.image_size;
        let result = guarded(async move { generator.generate_image(&prompt, size).await }).await;

        let mut state = self.state.write().await;
        let image = match result {
            Ok(image) if image.is_usable() => image,
            Ok(_) => {
                return self.fail_regeneration(
                    &mut state,
                    target,
                    "Failed to generate image: backend returned no image".to_string(),
                )
            }
            Err(e) => {
                return self.fail_regeneration(
                    &mut state,
                    target,
                    format!("Failed to generate image: {e}"),
                )
            }
        };

        match self.commit(
            &mut state,
            Action::CompleteRegeneration {
                entity_id: target.clone(),
                image,
            },
        ) {
            Some(CanvasEvent::RegenerationCompleted {
                previous_id,
                entity_id,
            }) => {
                info!(%previous_id, %entity_id, "image regenerated");
                RegenerationOutcome::Regenerated {
                    previous_id,
                    entity_id,
                }
            }
            Some(CanvasEvent::RegenerationFailed { entity_id, message }) => {
                warn!(%entity_id, %message, "regeneration rejected");
                RegenerationOutcome::Failed { entity_id, message }
            }
            _ => {
                debug!(entity_id = %target, "regeneration target removed while in flight");
                RegenerationOutcome::Discarded { entity_id: target }
            }
        }
    }

    fn fail_regeneration(
        &self,
        state: &mut CanvasState,
        entity_id: EntityId,
        message: String,
    ) -> RegenerationOutcome {
        warn!(%entity_id, %message, "regeneration failed");
        self.commit(
            state,
            Action::FailRegeneration {
                entity_id: entity_id.clone(),
                message: message.clone(),
            },
        );
        RegenerationOutcome::Failed { entity_id, message }
    }

    /// Feed every debounced prompt value into [`Self::on_prompt_settled`].
    ///
    /// Each settle runs on its own task so a later value is evaluated (and
    /// skipped by the latch) while an earlier regeneration is in flight. The
    /// watcher ends when the orchestrator is dropped.
    pub fn spawn_prompt_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let mut settled = self.prompt.subscribe();
        let orchestrator = Arc::downgrade(self);
        tokio::spawn(async move {
            while settled.changed().await.is_ok() {
                let value = settled.borrow_and_update().clone();
                let Some(orchestrator) = orchestrator.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    orchestrator.on_prompt_settled(&value).await;
                });
            }
            debug!("prompt watcher stopped");
        })
    }
}
