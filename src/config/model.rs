//! Config struct definition and default implementation.

use super::types::*;
use crate::platform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every [`GitProcess`](crate::git::GitProcess).
///
/// This struct represents the contents of `gitbridge.yaml`. Unknown fields in
/// the YAML are ignored for forward compatibility. A `Config` is built once at
/// startup and handed to each process it configures; nothing here is global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path (or PATH-resolved name) of the git executable.
    #[serde(default = "default_git_bin_path")]
    pub git_bin_path: String,

    /// Default timeout applied to invocations that do not set their own.
    /// `None` waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Whether stdin can be handed to git at all.
    ///
    /// Hosts that run without a usable stdin (services, some sandboxes) set
    /// this to false; invocations that need to write stdin then fail without
    /// spawning.
    #[serde(default = "default_true")]
    pub stdin_available: bool,

    /// Working directory used for commands that must run outside any
    /// repository. Defaults to the platform system directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_directory: Option<String>,

    /// How often the invoking thread checks whether git has exited.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Start git below normal scheduling priority. Meant for background
    /// maintenance that should not compete with interactive work.
    #[serde(default)]
    pub lower_priority: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_bin_path: default_git_bin_path(),
            timeout_secs: None,
            stdin_available: default_true(),
            system_directory: None,
            poll_interval_ms: default_poll_interval_ms(),
            lower_priority: false,
        }
    }
}

impl Config {
    /// Config pointing at a specific git executable, other fields defaulted.
    pub fn with_git_bin_path(git_bin_path: impl Into<String>) -> Self {
        Self {
            git_bin_path: git_bin_path.into(),
            ..Self::default()
        }
    }

    /// Default invocation timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Exit-poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Directory for commands that run outside an enlistment.
    pub fn system_directory(&self) -> PathBuf {
        match &self.system_directory {
            Some(dir) => PathBuf::from(dir),
            None => platform::system_directory(),
        }
    }
}
