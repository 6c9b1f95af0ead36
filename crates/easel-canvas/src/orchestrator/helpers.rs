//! Helper methods for the orchestrator

use std::future::Future;
use tracing::{debug, warn};

use super::core::CanvasOrchestrator;
use crate::error::{Error, Result};
use crate::events::CanvasEvent;
use crate::state::{Action, CanvasState};

impl CanvasOrchestrator {
    /// Apply an action and publish its event
    pub(crate) fn commit(&self, state: &mut CanvasState, action: Action) -> Option<CanvasEvent> {
        let event = state.apply(action)?;
        debug!(event = event.event_type(), "canvas event");
        self.events.publish(event.clone());
        Some(event)
    }

    /// Surface an error on the canvas and hand it back to the caller
    pub(crate) fn raise(&self, state: &mut CanvasState, err: Error) -> Error {
        warn!(code = err.code(), error = %err, "canvas operation failed");
        self.commit(state, Action::RaiseError(err.to_string()));
        err
    }

    /// Load the current prompt into both debouncer channels
    pub(crate) fn sync_prompt(&self, state: &CanvasState) {
        self.prompt.reset_now(state.prompt().to_string());
    }
}

/// Run a capability call on its own task so a panic inside the collaborator
/// surfaces as [`Error::Unexpected`].
pub(crate) async fn guarded<T, F>(call: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(call).await?
}
