//! Config loading and validation.

use super::model::Config;
use crate::error::{GitBridgeError, Result};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(GitBridgeError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            GitBridgeError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a map.
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_yaml::from_str(yaml).map_err(|e| {
            GitBridgeError::UserError(format!("failed to parse config YAML: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            GitBridgeError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// - `git_bin_path` must not be blank
    /// - `poll_interval_ms` must be positive
    /// - `timeout_secs`, when present, must be positive
    pub fn validate(&self) -> Result<()> {
        if self.git_bin_path.trim().is_empty() {
            return Err(GitBridgeError::UserError(
                "config validation failed: git_bin_path must not be empty".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(GitBridgeError::UserError(
                "config validation failed: poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(GitBridgeError::UserError(
                "config validation failed: timeout_secs must be greater than 0 (omit it to wait forever)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
