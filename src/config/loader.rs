//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine policy
//! configuration from a YAML file.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::EngineConfig;

/// Loads and provides access to the engine policy configuration.
///
/// # Example
///
/// ```no_run
/// use compliance_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/engine.yaml").unwrap();
/// println!("Escalation cap: tier {}", loader.config().escalation.max_tier);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified YAML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file (e.g., "./config/engine.yaml")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if the file
    /// is missing, contains invalid YAML, or fails policy validation.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let config: EngineConfig =
            serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
                path: path_str,
                message: e.to_string(),
            })?;
        config.validate()?;

        Ok(Self { config })
    }

    /// Wraps an already-built configuration, validating it first.
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the underlying engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_shipped_configuration() {
        let result = ConfigLoader::load("./config/engine.yaml");
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.config().escalation.interval_days, 30);
        assert_eq!(loader.config().escalation.max_tier, 3);
        assert_eq!(loader.config().one_time_window_days, Some(30));
    }

    #[test]
    fn test_load_missing_file_returns_error() {
        let result = ConfigLoader::load("/nonexistent/engine.yaml");
        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("engine.yaml"));
            }
            other => panic!("Expected ConfigNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_from_config_rejects_invalid_policy() {
        let mut config = EngineConfig::default();
        config.escalation.max_tier = 0;
        assert!(ConfigLoader::from_config(config).is_err());
    }

    #[test]
    fn test_default_loader_uses_default_policy() {
        let loader = ConfigLoader::default();
        assert_eq!(loader.config().escalation.max_tier, 3);
    }
}
