//! Workspace observer for reading live Fabric state.
//!
//! This module turns API listings into normalized [`Item`]s and resolves
//! lakehouse identifiers by display name.

use tracing::{debug, info};

use crate::error::Result;
use crate::items::{Item, ItemKind};

use super::api::WorkspaceApi;

/// Observer over a Fabric workspace.
#[derive(Debug)]
pub struct WorkspaceObserver<'a, A: WorkspaceApi + ?Sized> {
    /// Remote API.
    api: &'a A,
}

impl<'a, A: WorkspaceApi + ?Sized> WorkspaceObserver<'a, A> {
    /// Creates a new observer.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Lists every item in a workspace as normalized items.
    ///
    /// Items of unmanaged types are returned without a kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list_items(&self, workspace_id: &str) -> Result<Vec<Item>> {
        info!("Listing items in workspace {workspace_id}");

        let items: Vec<Item> = self
            .api
            .list_items(workspace_id)
            .await?
            .into_iter()
            .map(|i| Item::observed(i.id, i.item_type, i.display_name))
            .collect();

        debug!("Found {} items in workspace {workspace_id}", items.len());
        Ok(items)
    }

    /// Finds the id of the lakehouse with the given display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn find_lakehouse_id(&self, workspace_id: &str, display_name: &str) -> Result<Option<String>> {
        debug!("Resolving lakehouse '{display_name}' in workspace {workspace_id}");

        let id = self
            .api
            .list_lakehouses(workspace_id)
            .await?
            .into_iter()
            .find(|l| {
                ItemKind::from_type(&l.item_type) == Some(ItemKind::Lakehouse)
                    && l.display_name == display_name
            })
            .map(|l| l.id);

        Ok(id)
    }
}
