//! Fabric API types and data structures.
//!
//! This module defines the request and response bodies exchanged with the
//! Fabric REST API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::items::{ItemKind, NOTEBOOK_CONTENT_FILE};

/// Definition format for notebooks exported by Git integration.
pub const NOTEBOOK_DEFINITION_FORMAT: &str = "fabricGitSource";

/// An item as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceItem {
    /// Item id.
    pub id: String,
    /// Item type (`Lakehouse`, `Notebook`, ...).
    #[serde(rename = "type")]
    pub item_type: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning workspace.
    #[serde(default)]
    pub workspace_id: Option<String>,
}

/// A paged list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// Token for the next page, if any.
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// Request body for creating a notebook with a definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotebookRequest {
    /// Display name.
    pub display_name: String,
    /// Always `Notebook`.
    #[serde(rename = "type")]
    pub item_type: String,
    /// Inline definition.
    pub definition: ItemDefinition,
}

/// Item definition made of parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemDefinition {
    /// Definition format.
    pub format: String,
    /// Definition parts.
    pub parts: Vec<DefinitionPart>,
}

/// One file of an item definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionPart {
    /// Path of the part within the item.
    pub path: String,
    /// Encoded payload.
    pub payload: String,
    /// Payload encoding.
    pub payload_type: PayloadType,
}

/// Payload encodings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PayloadType {
    /// Base64 content inline in the request.
    InlineBase64,
}

impl CreateNotebookRequest {
    /// Builds a request from the notebook's definition text.
    #[must_use]
    pub fn from_content(display_name: impl Into<String>, content: &str) -> Self {
        Self {
            display_name: display_name.into(),
            item_type: ItemKind::Notebook.as_str().to_string(),
            definition: ItemDefinition {
                format: String::from(NOTEBOOK_DEFINITION_FORMAT),
                parts: vec![DefinitionPart {
                    path: String::from(NOTEBOOK_CONTENT_FILE),
                    payload: STANDARD.encode(content.as_bytes()),
                    payload_type: PayloadType::InlineBase64,
                }],
            },
        }
    }

    /// Decodes the notebook content part back to text.
    #[must_use]
    pub fn decoded_content(&self) -> Option<String> {
        let part = self
            .definition
            .parts
            .iter()
            .find(|p| p.path == NOTEBOOK_CONTENT_FILE)?;
        let bytes = STANDARD.decode(&part.payload).ok()?;
        String::from_utf8(bytes).ok()
    }
}
