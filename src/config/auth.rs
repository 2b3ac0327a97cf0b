//! Access token lookup and caching.
//!
//! Token acquisition itself is left to the operator's identity tooling; the
//! deployer only needs a bearer token. A token taken from the environment is
//! cached so later runs can reuse it with `--use-cached-token`.

use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{ConfigError, FabricDeployError, Result};

/// Environment variable holding the bearer token.
pub const TOKEN_ENV_VAR: &str = "FABRIC_ACCESS_TOKEN";

/// Cache directory name under the user cache dir.
const CACHE_DIR: &str = "fabric-deploy";

/// Cached token file name.
const TOKEN_FILE: &str = "token.txt";

/// Provides the bearer token for Fabric API calls.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    /// Location of the cached token.
    cache_path: PathBuf,
}

impl Default for TokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenProvider {
    /// Creates a provider caching under the user cache directory.
    #[must_use]
    pub fn new() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_cache_path(base.join(CACHE_DIR).join(TOKEN_FILE))
    }

    /// Creates a provider with an explicit cache file.
    #[must_use]
    pub fn with_cache_path(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
        }
    }

    /// Resolves the token from the environment or the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is available or the cache cannot be used.
    pub fn resolve(&self, use_cached: bool) -> Result<String> {
        self.resolve_from(use_cached, std::env::var(TOKEN_ENV_VAR).ok())
    }

    /// Resolves the token given the environment value.
    fn resolve_from(&self, use_cached: bool, env_token: Option<String>) -> Result<String> {
        if use_cached {
            return self.read_cached();
        }

        let token = env_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                FabricDeployError::Config(ConfigError::MissingEnvVar {
                    name: String::from(TOKEN_ENV_VAR),
                })
            })?;

        self.store(&token)?;
        Ok(token)
    }

    /// Reads the cached token.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no cached token.
    pub fn read_cached(&self) -> Result<String> {
        debug!("Reading cached token from: {}", self.cache_path.display());

        if !self.cache_path.is_file() {
            return Err(FabricDeployError::Config(ConfigError::FileNotFound {
                path: self.cache_path.clone(),
            }));
        }

        let token = std::fs::read_to_string(&self.cache_path)?.trim().to_string();
        if token.is_empty() {
            return Err(FabricDeployError::Config(ConfigError::ParseError {
                message: String::from("Cached token is empty"),
                location: Some(self.cache_path.display().to_string()),
            }));
        }

        Ok(token)
    }

    /// Writes the token to the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file cannot be written.
    pub fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.cache_path, token)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.cache_path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!("Cached access token at: {}", self.cache_path.display());
        Ok(())
    }
}
