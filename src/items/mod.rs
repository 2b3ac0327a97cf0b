//! Declared workspace items.
//!
//! This module reads the repository working copy and normalizes its
//! resource folders into [`Item`]s that can be compared with live state.

mod catalog;
mod types;

pub use catalog::{ItemCatalog, NOTEBOOK_CONTENT_FILE, PLATFORM_FILE};
pub use types::{Item, ItemKind, ItemSource, DEFAULT_LAKEHOUSE};
