//! CLI argument parsing for gitbridge.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// gitbridge: run git commands with timeouts, cancellation, and
/// credential-helper support.
///
/// Every command runs the configured git as a subprocess:
/// - output is drained concurrently, so large outputs never block
/// - `GIT_TRACE*` noise and interactive prompts are suppressed
/// - failures map to distinct exit codes
#[derive(Parser, Debug)]
#[command(name = "gitbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a gitbridge.yaml config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository to operate on (defaults to the one containing the
    /// current directory, if any).
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Append structured trace records (NDJSON) to this file.
    #[arg(long, global = true)]
    pub event_log: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for gitbridge.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the installed git version.
    Version,

    /// Read git config values.
    Config(ConfigCommand),

    /// Talk to git's credential helpers.
    Credential(CredentialCommand),

    /// Run an arbitrary git command.
    ///
    /// Everything after `--` is passed to git verbatim. git's stdout and
    /// stderr are echoed; a failing git exits with a git-failure code.
    Run(RunArgs),
}

/// Config subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Available config actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print one setting's value.
    Get(ConfigGetArgs),

    /// Print one setting's value as a validated integer.
    GetInt(ConfigGetIntArgs),

    /// Print every setting as `key=value`.
    List(ConfigListArgs),

    /// Print every distinct value of a multi-valued setting.
    GetAll(ConfigNameArgs),

    /// Print the settings in a section that apply to a url.
    UrlMatch(ConfigUrlMatchArgs),
}

/// Arguments for the `config get` command.
#[derive(Parser, Debug)]
pub struct ConfigGetArgs {
    /// Setting name (e.g., core.autocrlf).
    pub name: String,

    /// Which config file to read (any, local, global, system).
    #[arg(long, default_value = "any")]
    pub scope: String,

    /// Value to print when the setting is not set.
    #[arg(long)]
    pub default: Option<String>,
}

/// Arguments for the `config get-int` command.
#[derive(Parser, Debug)]
pub struct ConfigGetIntArgs {
    /// Setting name.
    pub name: String,

    /// Value to use when the setting is not set.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub default: i32,

    /// Smallest accepted value.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub min: i32,
}

/// Arguments for the `config list` command.
#[derive(Parser, Debug)]
pub struct ConfigListArgs {
    /// Only the repository's own settings.
    #[arg(long)]
    pub local: bool,
}

/// Arguments naming a single setting.
#[derive(Parser, Debug)]
pub struct ConfigNameArgs {
    /// Setting name.
    pub name: String,
}

/// Arguments for the `config url-match` command.
#[derive(Parser, Debug)]
pub struct ConfigUrlMatchArgs {
    /// Config section (e.g., http).
    pub section: String,

    /// Url to match against.
    pub url: String,
}

/// Credential subcommands.
#[derive(Parser, Debug)]
pub struct CredentialCommand {
    #[command(subcommand)]
    pub action: CredentialAction,
}

/// Available credential actions.
#[derive(Subcommand, Debug)]
pub enum CredentialAction {
    /// Ask the helpers for a credential and print it.
    Fill(CredentialUrlArgs),

    /// Store a credential. The password is read from stdin.
    Approve(CredentialApproveArgs),

    /// Erase a stored credential.
    Reject(CredentialUrlArgs),

    /// Ask the helpers for a client certificate's password.
    Cert(CredentialCertArgs),
}

/// Arguments naming a repository url.
#[derive(Parser, Debug)]
pub struct CredentialUrlArgs {
    /// Repository url (e.g., https://example.com/repo.git).
    pub url: String,
}

/// Arguments for the `credential approve` command.
#[derive(Parser, Debug)]
pub struct CredentialApproveArgs {
    /// Repository url.
    pub url: String,

    /// Username to store with the password.
    #[arg(short, long)]
    pub username: String,
}

/// Arguments for the `credential cert` command.
#[derive(Parser, Debug)]
pub struct CredentialCertArgs {
    /// Path of the certificate (the `http.sslCert` value).
    pub path: String,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Kill git after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Run against the repository's .git directory instead of its working
    /// tree.
    #[arg(long)]
    pub git_dir: bool,

    /// Arguments passed to git.
    #[arg(last = true, required = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
