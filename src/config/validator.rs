//! Configuration validation for deployment configs.
//!
//! All problems are collected before failing, so the first error reported is
//! accompanied by any warnings found along the way.

use crate::error::{ConfigError, FabricDeployError, Result};
use tracing::debug;
use uuid::Uuid;

use super::spec::DeployConfig;

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a deployment configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_workspace_id(config.source_workspace_id(), "source.workspace_id", &mut result);
        Self::validate_workspace_id(config.target_workspace_id(), "target.workspace_id", &mut result);
        Self::validate_pairing(config, &mut result);
        Self::validate_repo_path(config, &mut result);
        Self::validate_api(config, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(FabricDeployError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    /// Workspace ids are GUIDs.
    fn validate_workspace_id(id: &str, field: &str, result: &mut ValidationResult) {
        if id.is_empty() {
            result.errors.push(ValidationError {
                field: field.to_string(),
                message: String::from("Workspace id cannot be empty"),
            });
        } else if Uuid::parse_str(id).is_err() {
            result.errors.push(ValidationError {
                field: field.to_string(),
                message: format!("Workspace id '{id}' is not a GUID"),
            });
        }
    }

    /// Deploying a workspace onto itself is allowed but almost never intended.
    fn validate_pairing(config: &DeployConfig, result: &mut ValidationResult) {
        if config
            .source_workspace_id()
            .eq_ignore_ascii_case(config.target_workspace_id())
        {
            result.warnings.push(String::from(
                "source and target workspace are the same; dangling lakehouses will be deleted from it",
            ));
        }
    }

    fn validate_repo_path(config: &DeployConfig, result: &mut ValidationResult) {
        if config.repo_local_path.as_os_str().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("repo_local_path"),
                message: String::from("Repository path cannot be empty"),
            });
        }
    }

    fn validate_api(config: &DeployConfig, result: &mut ValidationResult) {
        let url = config.api_base_url.as_str();
        if url.starts_with("http://") {
            result
                .warnings
                .push(format!("api_base_url '{url}' is not HTTPS; the access token is sent in clear"));
        } else if !url.starts_with("https://") {
            result.errors.push(ValidationError {
                field: String::from("api_base_url"),
                message: format!("api_base_url '{url}' must be an http(s) URL"),
            });
        }

        if config.request_timeout_secs == 0 {
            result.errors.push(ValidationError {
                field: String::from("request_timeout_secs"),
                message: String::from("Request timeout must be greater than zero"),
            });
        }
    }
}

impl ValidationResult {
    /// Returns true if no errors were found.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "11111111-1111-1111-1111-111111111111";
    const TARGET: &str = "22222222-2222-2222-2222-222222222222";

    #[test]
    fn test_valid_config() {
        let config = DeployConfig::new(SOURCE, TARGET, "/repo");
        let result = ConfigValidator::new().validate(&config).expect("Config should be valid");

        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_workspace_id() {
        let config = DeployConfig::new("not-a-guid", TARGET, "/repo");
        let result = ConfigValidator::new().validate(&config);

        match result {
            Err(FabricDeployError::Config(ConfigError::ValidationError { field, .. })) => {
                assert_eq!(field.as_deref(), Some("source.workspace_id"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_same_workspace_warns() {
        let config = DeployConfig::new(SOURCE, SOURCE, "/repo");
        let result = ConfigValidator::new().validate(&config).expect("Config should be valid");

        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_plain_http_warns() {
        let mut config = DeployConfig::new(SOURCE, TARGET, "/repo");
        config.api_base_url = String::from("http://localhost:8080");
        let result = ConfigValidator::new().validate(&config).expect("Config should be valid");

        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_bad_url_rejected() {
        let mut config = DeployConfig::new(SOURCE, TARGET, "/repo");
        config.api_base_url = String::from("ftp://fabric");

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = DeployConfig::new(SOURCE, TARGET, "/repo");
        config.request_timeout_secs = 0;

        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
