//! Abstract workspace operations.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{CreateNotebookRequest, WorkspaceItem};

/// Remote operations the reconciliation engine relies on.
///
/// Every call either succeeds with the status the operation expects or fails;
/// implementations do not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    /// Lists every item in a workspace.
    async fn list_items(&self, workspace_id: &str) -> Result<Vec<WorkspaceItem>>;

    /// Lists the lakehouses in a workspace.
    async fn list_lakehouses(&self, workspace_id: &str) -> Result<Vec<WorkspaceItem>>;

    /// Creates a lakehouse from its declared metadata and returns its id.
    async fn create_lakehouse(&self, workspace_id: &str, definition: &serde_json::Value) -> Result<String>;

    /// Deletes a lakehouse by id.
    async fn delete_lakehouse(&self, workspace_id: &str, lakehouse_id: &str) -> Result<()>;

    /// Creates a notebook with inline content.
    async fn create_notebook(&self, workspace_id: &str, request: &CreateNotebookRequest) -> Result<()>;
}
