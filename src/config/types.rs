//! Configuration types and defaults for gitbridge.

use serde::{Deserialize, Serialize};

/// Which git config file a read is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigScope {
    /// Let git resolve the value across all config files (default).
    #[default]
    Any,
    /// `--local`: the repository's own `.git/config`.
    Local,
    /// `--global`: the user's config.
    Global,
    /// `--system`: the installation-wide config.
    System,
}

impl ConfigScope {
    /// Parse a config scope from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Self::Any),
            "local" => Some(Self::Local),
            "global" => Some(Self::Global),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

// Default value functions for serde
pub(crate) fn default_git_bin_path() -> String {
    "git".to_string()
}
pub(crate) fn default_poll_interval_ms() -> u64 {
    10
}
pub(crate) fn default_true() -> bool {
    true
}
