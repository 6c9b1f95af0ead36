//! Orchestrator core structure
//!
//! Contains the `CanvasOrchestrator` struct and its builder methods.

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

use crate::capability::{IdGenerator, ImageGenerator, ImageStore, UuidIdGenerator};
use crate::config::CanvasConfig;
use crate::debounce::Debouncer;
use crate::events::{CanvasEvent, EventBus};
use crate::state::{CanvasSnapshot, CanvasState};

/// Coordinates canvas state with generation and persistence.
///
/// All mutation goes through [`CanvasState::apply`] under a write lock. The
/// lock is never held across a capability call: an operation commits its
/// optimistic change, releases the lock, awaits the collaborator, then
/// re-acquires the lock to commit the resolution against the current state.
pub struct CanvasOrchestrator {
    pub(crate) state: RwLock<CanvasState>,
    pub(crate) prompt: Debouncer<String>,
    pub(crate) generator: Arc<dyn ImageGenerator>,
    pub(crate) store: Arc<dyn ImageStore>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) events: EventBus,
    pub(crate) config: CanvasConfig,
}

impl CanvasOrchestrator {
    /// Create a new orchestrator over an empty, unmounted canvas
    #[must_use]
    pub fn new(
        config: CanvasConfig,
        generator: Arc<dyn ImageGenerator>,
        store: Arc<dyn ImageStore>,
    ) -> Self {
        info!(
            generator = generator.name(),
            width = config.width,
            height = config.height,
            "Creating canvas orchestrator"
        );
        Self {
            state: RwLock::new(CanvasState::new(config.bounds(), config.grid())),
            prompt: Debouncer::new(String::new(), config.debounce()),
            generator,
            store,
            ids: Arc::new(UuidIdGenerator),
            events: EventBus::new(config.event_capacity),
            config,
        }
    }

    /// Set the id generator used for duplicates
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Canvas configuration
    #[must_use]
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Event bus the orchestrator publishes on
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to canvas events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CanvasEvent> {
        self.events.subscribe()
    }

    /// Render-ready copy of the canvas
    pub async fn snapshot(&self) -> CanvasSnapshot {
        self.state.read().await.snapshot()
    }

    /// Prompt value as last published by the debouncer
    #[must_use]
    pub fn debounced_prompt(&self) -> String {
        self.prompt.debounced()
    }
}

impl std::fmt::Debug for CanvasOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasOrchestrator")
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
