//! Interpretation of `git config` results.

use crate::error::{GitBridgeError, Result};
use crate::git::result::GitResult;
use crate::git::scan::LineScanner;
use std::collections::{BTreeMap, BTreeSet};

/// The result of reading one config setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigResult {
    result: GitResult,
    config_name: String,
}

impl ConfigResult {
    pub fn new(result: GitResult, config_name: impl Into<String>) -> Self {
        Self {
            result,
            config_name: config_name.into(),
        }
    }

    pub fn result(&self) -> &GitResult {
        &self.result
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    /// The setting's value as text.
    ///
    /// A failing exit whose stderr has real errors (not just `warning:`
    /// lines) is an error. A successful exit yields stdout without trailing
    /// newlines. A failing exit without errors means "not set" and yields
    /// `default`.
    pub fn try_parse_as_string(&self, default: Option<&str>) -> Result<Option<String>> {
        if self.result.exit_code_is_failure() && self.result.stderr_contains_errors() {
            return Err(GitBridgeError::ExternalTool(format!(
                "Error while reading '{}' from config: {}",
                self.config_name, self.result.stderr
            )));
        }

        if self.result.exit_code_is_success() {
            return Ok(Some(self.result.stdout.trim_end_matches('\n').to_string()));
        }

        Ok(default.map(str::to_string))
    }

    /// The setting's value as an integer of at least `min_value`.
    ///
    /// Unset or blank settings yield `default`.
    pub fn try_parse_as_int(&self, default: i32, min_value: i32) -> Result<i32> {
        let value = self.try_parse_as_string(None)?;
        let text = match value.as_deref().map(str::trim) {
            None | Some("") => return Ok(default),
            Some(text) => text,
        };

        let value: i32 = text.parse().map_err(|_| {
            GitBridgeError::ConfigType(format!(
                "Misconfigured config setting {}, could not parse value `{}` as an int",
                self.config_name, text
            ))
        })?;

        if value < min_value {
            return Err(GitBridgeError::ConfigType(format!(
                "Invalid value {} for setting {}, value must be greater than or equal to {}",
                value, self.config_name, min_value
            )));
        }

        Ok(value)
    }
}

/// The result of `config --get-all`: every distinct non-empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiConfigResult {
    pub result: GitResult,
    pub values: BTreeSet<String>,
}

impl MultiConfigResult {
    pub fn new(result: GitResult) -> Self {
        let values = LineScanner::new(&result.stdout)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { result, values }
    }
}

/// One config key and every value git listed for it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitConfigSetting {
    /// Key as git first printed it.
    pub name: String,
    pub values: Vec<String>,
}

impl GitConfigSetting {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    pub fn add(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// The last listed value, which is the one git itself applies.
    pub fn effective_value(&self) -> Option<&str> {
        self.values.last().map(String::as_str)
    }

    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// Config settings keyed by lowercased name.
pub type ConfigSettings = BTreeMap<String, GitConfigSetting>;

/// Parse `key<separator>value` lines into settings.
///
/// Keys compare case-insensitively. A repeated key keeps all its values.
pub fn parse_key_values(input: &str, separator: char) -> ConfigSettings {
    let mut settings = ConfigSettings::new();

    for (key, value) in LineScanner::new(input).key_values(separator) {
        settings
            .entry(key.to_lowercase())
            .and_modify(|setting| setting.add(value))
            .or_insert_with(|| GitConfigSetting::new(key, value));
    }

    settings
}
