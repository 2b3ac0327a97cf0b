//! Configuration module for the Fabric deployment system.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `fabric.deploy.yaml`
//! - Validation of configuration values
//! - Content hashing for notebook fingerprints and plan identity
//! - Access token lookup and caching

mod auth;
mod hash;
mod parser;
mod spec;
mod validator;

pub use auth::{TokenProvider, TOKEN_ENV_VAR};
pub use hash::ContentHasher;
pub use parser::{find_config_file, ConfigParser, DEFAULT_CONFIG_FILES};
pub use spec::{DeployConfig, WorkspaceRef, DEFAULT_API_BASE_URL};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
