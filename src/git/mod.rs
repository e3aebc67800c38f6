//! Running git as a subprocess.
//!
//! A [`GitProcess`] turns a [`LaunchDescriptor`] into a running git, drains
//! its output, enforces the timeout, and returns a [`GitResult`]. The
//! [`CancellationGate`] inside each process lets another thread stop it.
//! Results are interpreted by the credential and config modules.

mod commands;
pub mod config_result;
pub mod credential;
mod gate;
mod invoke;
pub mod launch;
mod process;
mod result;
pub mod scan;
pub mod version;

pub use commands::{HIDDEN_REFS_PREFIX, expire_time_date_string, hidden_refspec};
pub use config_result::{ConfigResult, ConfigSettings, GitConfigSetting, MultiConfigResult, parse_key_values};
pub use credential::{Credential, CredentialStore};
pub use gate::{CancellationGate, KillReport};
pub use invoke::{InvocationRequest, LineHandler, StdinWriter, StdoutMode};
pub use launch::{LaunchDescriptor, USE_GVFS_HELPER_CONFIG};
pub use process::GitProcess;
pub use result::{GitResult, ResultKind};
pub use scan::LineScanner;
pub use version::GitVersion;
