//! Orchestrator - the canvas's only writer
//!
//! Ties user intents (select, type, duplicate, vary, save, arrange) to the
//! state reducer and the external capabilities.
//!
//! # Module Structure
//!
//! - `core`: Orchestrator struct, builder methods, snapshots
//! - `helpers`: Commit/raise helpers and capability call guarding
//! - `selection`: Mount, selection, prompt editing and debounced regeneration
//! - `variations`: Variation placeholders and reconciliation
//! - `entities`: Duplicate, delete, move, resize and grid arrangement
//! - `catalog`: Saving and the saved-image catalog
//! - `types`: Operation outcomes

mod catalog;
mod core;
mod entities;
mod helpers;
mod selection;
mod types;
mod variations;


pub use core::CanvasOrchestrator;
pub use types::{RegenerationOutcome, VariationReport};
