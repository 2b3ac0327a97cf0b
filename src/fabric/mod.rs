//! Fabric REST API integration module.
//!
//! This module provides the abstract [`WorkspaceApi`] the reconciliation
//! engine talks to, its HTTP implementation, and the observer that turns
//! API listings into normalized items.

mod api;
mod client;
mod observer;
mod types;

#[cfg(test)]
pub use api::MockWorkspaceApi;
pub use api::WorkspaceApi;
pub use client::FabricClient;
pub use observer::WorkspaceObserver;
pub use types::{
    CreateNotebookRequest, DefinitionPart, ItemDefinition, ListResponse, PayloadType, WorkspaceItem,
    NOTEBOOK_DEFINITION_FORMAT,
};
