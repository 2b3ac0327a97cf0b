//! Repository scanner for declared items.
//!
//! Resource folders are recognized by their `<DisplayName>.<Kind>` suffix and
//! must carry a `.platform` sidecar whose `metadata` object names the item.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ContentHasher;
use crate::error::{ConfigError, FabricDeployError, Result};

use super::types::{Item, ItemKind};

/// Metadata sidecar file name.
pub const PLATFORM_FILE: &str = ".platform";

/// Notebook definition file name.
pub const NOTEBOOK_CONTENT_FILE: &str = "notebook-content.py";

/// Scanner producing the declared state from a repository working copy.
#[derive(Debug)]
pub struct ItemCatalog {
    /// Repository root.
    root: PathBuf,
    /// Hasher for notebook fingerprints.
    hasher: ContentHasher,
}

impl ItemCatalog {
    /// Creates a catalog rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hasher: ContentHasher::new(),
        }
    }

    /// Scans the repository for Lakehouse and Notebook folders.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist, a folder is malformed,
    /// or two items of the same kind share a display name.
    pub fn scan(&self) -> Result<Vec<Item>> {
        if !self.root.is_dir() {
            return Err(ConfigError::RepositoryNotFound {
                path: self.root.clone(),
            }
            .into());
        }

        info!("Scanning repository: {}", self.root.display());

        let mut items = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let Some(kind) = ItemKind::ALL
                .into_iter()
                .find(|k| name.ends_with(k.folder_suffix()))
            else {
                continue;
            };

            let item = self.read_item(entry.path(), kind)?;
            debug!("Found {item} at {}", entry.path().display());
            items.push(item);
        }

        Self::check_unique(&items)?;

        info!("Repository declares {} items", items.len());
        Ok(items)
    }

    /// Reads one resource folder.
    fn read_item(&self, folder: &Path, kind: ItemKind) -> Result<Item> {
        let platform_path = folder.join(PLATFORM_FILE);
        if !platform_path.is_file() {
            return Err(ConfigError::malformed(folder, format!("missing {PLATFORM_FILE} file")).into());
        }

        let content = std::fs::read_to_string(&platform_path)?;
        let document: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| ConfigError::malformed(folder, format!("invalid {PLATFORM_FILE}: {e}")))?;

        let metadata = document
            .get("metadata")
            .filter(|m| m.is_object())
            .cloned()
            .ok_or_else(|| ConfigError::malformed(folder, "no metadata object"))?;

        let item_type = metadata
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ConfigError::malformed(folder, "metadata has no type"))?;
        let display_name = metadata
            .get("displayName")
            .and_then(serde_json::Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ConfigError::malformed(folder, "metadata has no displayName"))?;

        if item_type != kind.as_str() {
            return Err(ConfigError::malformed(
                folder,
                format!("metadata type '{item_type}' does not match folder kind {kind}"),
            )
            .into());
        }

        let mut item = Item::declared(kind, display_name);

        if kind == ItemKind::Notebook {
            let content_path = folder.join(NOTEBOOK_CONTENT_FILE);
            if !content_path.is_file() {
                return Err(
                    ConfigError::malformed(folder, format!("missing {NOTEBOOK_CONTENT_FILE}")).into(),
                );
            }
            item = item.with_fingerprint(self.hasher.hash_file(&content_path)?);
        }

        Ok(item.with_source(folder, metadata))
    }

    /// Rejects duplicate display names within a kind.
    fn check_unique(items: &[Item]) -> Result<()> {
        let mut seen: HashSet<(ItemKind, &str)> = HashSet::new();

        for item in items {
            let Some(kind) = item.kind() else { continue };
            if !seen.insert((kind, item.display_name.as_str())) {
                return Err(FabricDeployError::Config(ConfigError::DuplicateName {
                    resource_type: kind.to_string(),
                    name: item.display_name.clone(),
                }));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_item(root: &Path, folder: &str, item_type: &str, name: &str) -> PathBuf {
        let dir = root.join(folder);
        std::fs::create_dir_all(&dir).expect("Failed to create item dir");
        let platform = serde_json::json!({
            "$schema": "https://developer.microsoft.com/json-schemas/fabric/gitIntegration/platformProperties/2.0.0/schema.json",
            "metadata": { "type": item_type, "displayName": name },
            "config": { "version": "2.0", "logicalId": "00000000-0000-0000-0000-000000000000" }
        });
        std::fs::write(dir.join(PLATFORM_FILE), platform.to_string()).expect("Failed to write sidecar");
        dir
    }

    fn write_notebook(root: &Path, name: &str, content: &str) {
        let dir = write_item(root, &format!("{name}.Notebook"), "Notebook", name);
        std::fs::write(dir.join(NOTEBOOK_CONTENT_FILE), content).expect("Failed to write notebook");
    }

    #[test]
    fn test_scan_finds_nested_items() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write_item(temp.path(), "z_default_lakehouse.Lakehouse", "Lakehouse", "z_default_lakehouse");
        write_item(temp.path(), "storage/bronze.Lakehouse", "Lakehouse", "bronze");
        write_notebook(temp.path(), "ingest", "# notebook");
        std::fs::create_dir_all(temp.path().join("docs")).expect("Failed to create dir");

        let items = ItemCatalog::new(temp.path()).scan().expect("Scan failed");

        assert_eq!(items.len(), 3);
        let lakehouses: Vec<_> = items.iter().filter(|i| i.is(ItemKind::Lakehouse)).collect();
        assert_eq!(lakehouses.len(), 2);
        assert!(items.iter().all(|i| i.id.is_none()));
    }

    #[test]
    fn test_notebook_fingerprint() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write_notebook(temp.path(), "ingest", "print('hello')");

        let items = ItemCatalog::new(temp.path()).scan().expect("Scan failed");
        let expected = ContentHasher::new().hash_bytes(b"print('hello')");

        assert_eq!(items[0].content_fingerprint.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn test_lakehouse_keeps_raw_metadata() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write_item(temp.path(), "bronze.Lakehouse", "Lakehouse", "bronze");

        let items = ItemCatalog::new(temp.path()).scan().expect("Scan failed");
        let source = items[0].source.as_ref().expect("Declared item has a source");

        assert_eq!(source.metadata["displayName"], "bronze");
        assert!(source.folder.ends_with("bronze.Lakehouse"));
        assert!(items[0].content_fingerprint.is_none());
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let result = ItemCatalog::new(temp.path().join("absent")).scan();

        assert!(matches!(
            result,
            Err(FabricDeployError::Config(ConfigError::RepositoryNotFound { .. }))
        ));
    }

    #[test]
    fn test_missing_sidecar() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(temp.path().join("bronze.Lakehouse")).expect("Failed to create dir");

        let result = ItemCatalog::new(temp.path()).scan();
        assert!(matches!(
            result,
            Err(FabricDeployError::Config(ConfigError::MalformedItem { .. }))
        ));
    }

    #[test]
    fn test_missing_display_name() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = temp.path().join("bronze.Lakehouse");
        std::fs::create_dir_all(&dir).expect("Failed to create dir");
        std::fs::write(dir.join(PLATFORM_FILE), r#"{"metadata": {"type": "Lakehouse"}}"#)
            .expect("Failed to write sidecar");

        let result = ItemCatalog::new(temp.path()).scan();
        assert!(matches!(
            result,
            Err(FabricDeployError::Config(ConfigError::MalformedItem { .. }))
        ));
    }

    #[test]
    fn test_notebook_without_content() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write_item(temp.path(), "ingest.Notebook", "Notebook", "ingest");

        let result = ItemCatalog::new(temp.path()).scan();
        assert!(matches!(
            result,
            Err(FabricDeployError::Config(ConfigError::MalformedItem { .. }))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write_item(temp.path(), "bronze.Lakehouse", "Notebook", "bronze");

        let result = ItemCatalog::new(temp.path()).scan();
        assert!(matches!(
            result,
            Err(FabricDeployError::Config(ConfigError::MalformedItem { .. }))
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write_item(temp.path(), "a/bronze.Lakehouse", "Lakehouse", "bronze");
        write_item(temp.path(), "b/bronze.Lakehouse", "Lakehouse", "bronze");

        let result = ItemCatalog::new(temp.path()).scan();
        assert!(matches!(
            result,
            Err(FabricDeployError::Config(ConfigError::DuplicateName { .. }))
        ));
    }

    #[test]
    fn test_same_name_across_kinds_allowed() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write_item(temp.path(), "sales.Lakehouse", "Lakehouse", "sales");
        write_notebook(temp.path(), "sales", "x = 1");

        let items = ItemCatalog::new(temp.path()).scan().expect("Scan failed");
        assert_eq!(items.len(), 2);
    }
}
