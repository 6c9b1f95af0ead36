//! Easel Gen - image generation for the canvas
//!
//! - `backend`: text-to-image backends (OpenAI `images/generations`)
//! - `variator`: LLM prompt rewriting for variations
//! - `client`: the canvas-facing [`GenerationClient`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
mod http;
pub mod util;
pub mod variator;

pub use backend::{ImageBackend, OpenAiImageBackend};
pub use client::GenerationClient;
pub use config::GenerationConfig;
pub use error::{Error, Result};
pub use variator::{parse_variations, ChatPromptVariator, PromptVariator};
