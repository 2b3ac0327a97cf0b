//! Configuration specification types for the deployment system.
//!
//! This module defines the structs that map to the `fabric.deploy.yaml` file.
//! A parsed [`DeployConfig`] is immutable and handed to each component that
//! needs it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default Fabric REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.fabric.microsoft.com/v1";

/// Default HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// The root configuration structure for a deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployConfig {
    /// Workspace the repository was exported from.
    pub source: WorkspaceRef,
    /// Workspace to deploy into.
    pub target: WorkspaceRef,
    /// Local working copy of the repository.
    pub repo_local_path: PathBuf,
    /// Fabric REST API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Reference to a Fabric workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceRef {
    /// Workspace GUID.
    pub workspace_id: String,
}

impl DeployConfig {
    /// Creates a configuration with default API settings.
    #[must_use]
    pub fn new(
        source_workspace_id: impl Into<String>,
        target_workspace_id: impl Into<String>,
        repo_local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: WorkspaceRef {
                workspace_id: source_workspace_id.into(),
            },
            target: WorkspaceRef {
                workspace_id: target_workspace_id.into(),
            },
            repo_local_path: repo_local_path.into(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Source workspace id.
    #[must_use]
    pub fn source_workspace_id(&self) -> &str {
        &self.source.workspace_id
    }

    /// Target workspace id.
    #[must_use]
    pub fn target_workspace_id(&self) -> &str {
        &self.target.workspace_id
    }

    /// Resolves a relative repository path against the config file directory.
    #[must_use]
    pub fn with_base_dir(mut self, base: &Path) -> Self {
        if self.repo_local_path.is_relative() {
            self.repo_local_path = base.join(&self.repo_local_path);
        }
        self
    }
}

fn default_api_base_url() -> String {
    String::from(DEFAULT_API_BASE_URL)
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
