//! Easel Canvas - state orchestration for an AI image canvas
//!
//! This crate owns the canvas: a set of positioned image entities, the
//! current selection and prompt, and the lifecycle of everything that
//! changes them.
//!
//! - `entity`: image entities, positions and container bounds
//! - `layout`: grid reflow and placement of duplicates and variations
//! - `state`: the canvas reducer and regeneration latch
//! - `debounce`: trailing prompt debouncer
//! - `capability`: traits for generation, persistence and id allocation
//! - `orchestrator`: the single writer tying it all together
//! - `events`: broadcast of applied changes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capability;
pub mod config;
pub mod debounce;
pub mod entity;
pub mod error;
pub mod events;
pub mod layout;
pub mod orchestrator;
pub mod state;

pub use capability::{
    GeneratedImage, IdGenerator, ImageGenerator, ImageStore, LineageRecorder, RelationshipKind,
    SaveRequest, SavedImage, UuidIdGenerator, VariationResult,
};
pub use config::CanvasConfig;
pub use debounce::Debouncer;
pub use entity::{Bounds, EntityId, ImageEntity, Position};
pub use error::{Error, Result};
pub use events::{CanvasEvent, EventBus};
pub use layout::{GridArrangement, GridLayout};
pub use orchestrator::{CanvasOrchestrator, RegenerationOutcome, VariationReport};
pub use state::{
    Action, BatchToken, CanvasSnapshot, CanvasState, RegenerationState, INITIAL_PLACEHOLDER_ID,
    VARIATION_SLOTS,
};
