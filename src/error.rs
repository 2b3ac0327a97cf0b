//! Error types for the Fabric deployment system.
//!
//! This module provides the error hierarchy for every stage of a deployment
//! cycle: configuration and repository input, the Fabric REST API, planning
//! and execution, and the local run lock.

use std::path::PathBuf;
use thiserror::Error;

use crate::planner::MappingState;

/// The main error type for the Fabric deployment system.
#[derive(Debug, Error)]
pub enum FabricDeployError {
    /// Configuration or declared-state errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fabric API errors.
    #[error("Fabric API error: {0}")]
    Fabric(#[from] FabricError),

    /// Planning and execution errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Local run-state errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and declared-state errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// The repository working copy does not exist.
    #[error("Repository directory not found: {path}")]
    RepositoryNotFound {
        /// Path that was expected to hold the repository.
        path: PathBuf,
    },

    /// A resource folder is missing metadata or carries invalid metadata.
    #[error("Malformed item at {path}: {reason}")]
    MalformedItem {
        /// Resource folder path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Duplicate resource definition.
    #[error("Duplicate {resource_type} name: {name}")]
    DuplicateName {
        /// Type of resource (Lakehouse, Notebook).
        resource_type: String,
        /// The duplicated name.
        name: String,
    },
}

/// Fabric REST API errors.
#[derive(Debug, Error)]
pub enum FabricError {
    /// Authentication failed.
    #[error("Fabric authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The API answered with a status other than the one the operation expects.
    #[error("{operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// Operation that was attempted.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Lakehouse not found by display name.
    #[error("No lakehouse named '{display_name}' in workspace {workspace_id}")]
    LakehouseNotFound {
        /// Workspace that was searched.
        workspace_id: String,
        /// Display name that was looked up.
        display_name: String,
    },

    /// Network error.
    #[error("Network error communicating with Fabric: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from Fabric API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Planning and execution errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The declared state has no default lakehouse.
    #[error("Source check failed: no Lakehouse named '{name}' in the repository")]
    MissingDefaultLakehouse {
        /// Required display name.
        name: String,
    },

    /// The default lakehouse could not be resolved in a workspace.
    #[error("Default lakehouse '{name}' not found in workspace {workspace_id}")]
    SentinelNotFound {
        /// Required display name.
        name: String,
        /// Workspace that lacks it.
        workspace_id: String,
    },

    /// The lakehouse identity mapping is not fresh.
    #[error("Lakehouse mapping is {state}; refresh it before deploying notebooks")]
    MappingStale {
        /// Mapping state at the time of the attempt.
        state: MappingState,
    },

    /// The plan was never computed or has already been executed.
    #[error("No current plan: compute the plan before running it")]
    PlanNotCurrent,

    /// The plan and the identity mapping name different workspaces.
    #[error("Plan is for {plan_source} -> {plan_target} but the mapping is for {mapping_source} -> {mapping_target}")]
    WorkspaceMismatch {
        /// Plan source workspace.
        plan_source: String,
        /// Plan target workspace.
        plan_target: String,
        /// Mapping source workspace.
        mapping_source: String,
        /// Mapping target workspace.
        mapping_target: String,
    },

    /// A planned item has no declared definition.
    #[error("{kind} '{name}' not found in repository")]
    MissingDefinition {
        /// Item kind.
        kind: String,
        /// Display name.
        name: String,
    },
}

/// Local run-state errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// The run lock is held by another operator.
    #[error("Target workspace is locked by another run (holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Lock acquisition or release failed.
    #[error("Failed to manage run lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// The lock file is unreadable.
    #[error("Lock file is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },
}

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, FabricDeployError>;

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a malformed-item error.
    #[must_use]
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedItem {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl FabricError {
    /// Creates an unexpected-status error.
    #[must_use]
    pub fn unexpected_status(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}
