//! Easel Store - persistence for the canvas
//!
//! SQLite records for generated images and their lineage, plus a media
//! directory holding the blobs of saved images.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod media;
pub mod store;

pub use config::StorageConfig;
pub use error::{Error, Result};
pub use media::{MediaBlob, MediaStore};
pub use store::{ImageRecord, RelationshipRecord, SqliteImageStore};
