//! Normalized item types shared by declared and live state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Display name of the lakehouse every notebook is bound to by default.
pub const DEFAULT_LAKEHOUSE: &str = "z_default_lakehouse";

/// Kinds of items the deployer manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// Storage container; can be created and deleted.
    Lakehouse,
    /// Compute definition; can only be created.
    Notebook,
}

/// A declared or observed workspace item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Raw item type as reported by the repository or the API.
    pub item_type: String,
    /// Display name, unique per kind within a workspace.
    pub display_name: String,
    /// Remote identifier (observed items only).
    pub id: Option<String>,
    /// Hex digest of the notebook definition (declared notebooks only).
    pub content_fingerprint: Option<String>,
    /// Where a declared item came from.
    #[serde(skip)]
    pub source: Option<ItemSource>,
}

/// Repository origin of a declared item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSource {
    /// Resource folder (`<DisplayName>.<Kind>`).
    pub folder: PathBuf,
    /// Raw `metadata` object from the `.platform` sidecar.
    pub metadata: serde_json::Value,
}

impl ItemKind {
    /// All managed kinds, in deployment order.
    pub const ALL: [Self; 2] = [Self::Lakehouse, Self::Notebook];

    /// Parses an API/sidecar type string.
    #[must_use]
    pub fn from_type(item_type: &str) -> Option<Self> {
        match item_type {
            "Lakehouse" => Some(Self::Lakehouse),
            "Notebook" => Some(Self::Notebook),
            _ => None,
        }
    }

    /// The type string used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lakehouse => "Lakehouse",
            Self::Notebook => "Notebook",
        }
    }

    /// Folder-name suffix used in the repository.
    #[must_use]
    pub const fn folder_suffix(self) -> &'static str {
        match self {
            Self::Lakehouse => ".Lakehouse",
            Self::Notebook => ".Notebook",
        }
    }
}

impl Item {
    /// Creates an item observed in a workspace.
    #[must_use]
    pub fn observed(id: impl Into<String>, item_type: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            display_name: display_name.into(),
            id: Some(id.into()),
            content_fingerprint: None,
            source: None,
        }
    }

    /// Creates a declared item without repository provenance.
    #[must_use]
    pub fn declared(kind: ItemKind, display_name: impl Into<String>) -> Self {
        Self {
            item_type: kind.as_str().to_string(),
            display_name: display_name.into(),
            id: None,
            content_fingerprint: None,
            source: None,
        }
    }

    /// Attaches repository provenance.
    #[must_use]
    pub fn with_source(mut self, folder: impl Into<PathBuf>, metadata: serde_json::Value) -> Self {
        self.source = Some(ItemSource {
            folder: folder.into(),
            metadata,
        });
        self
    }

    /// Attaches a content fingerprint.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.content_fingerprint = Some(fingerprint.into());
        self
    }

    /// The managed kind, if the type is recognized.
    #[must_use]
    pub fn kind(&self) -> Option<ItemKind> {
        ItemKind::from_type(&self.item_type)
    }

    /// Returns true if this item has the given kind.
    #[must_use]
    pub fn is(&self, kind: ItemKind) -> bool {
        self.kind() == Some(kind)
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.item_type, self.display_name)?;
        if let Some(id) = &self.id {
            write!(f, " ({id})")?;
        }
        Ok(())
    }
}
