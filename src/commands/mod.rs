//! Command implementations for gitbridge.
//!
//! This module builds the per-invocation [`Session`] (config, git process,
//! trace sink) and routes CLI commands to their handlers.

mod config;
mod credential;
mod run;
mod version;

use crate::cli::{Cli, Command};
use gitbridge::config::Config;
use gitbridge::enlistment::Enlistment;
use gitbridge::error::Result;
use gitbridge::git::GitProcess;
use gitbridge::trace::{EventLogTracer, LogTracer, Tracer};
use std::path::Path;
use tracing::debug;

/// Everything a command handler needs.
pub struct Session {
    pub config: Config,
    pub enlistment: Option<Enlistment>,
    pub process: GitProcess,
    pub tracer: Box<dyn Tracer>,
}

impl Session {
    /// Build a session from the global CLI flags.
    ///
    /// An explicit `--repo` must be inside a repository. Without it, the
    /// repository containing the current directory is used if there is one.
    pub fn open(config_path: Option<&Path>, repo: Option<&Path>, event_log: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        config.validate()?;

        let enlistment = match repo {
            Some(repo) => Some(Enlistment::resolve_from(repo, &config.git_bin_path)?),
            None => Enlistment::resolve(&config.git_bin_path).ok(),
        };

        let process = match &enlistment {
            Some(enlistment) => {
                debug!(root = %enlistment.working_directory_root.display(), "using enlistment");
                GitProcess::for_enlistment(enlistment, &config)?
            }
            None => GitProcess::new(&config, None)?,
        };

        let tracer: Box<dyn Tracer> = match event_log {
            Some(path) => Box::new(EventLogTracer::new(path)?),
            None => Box::new(LogTracer),
        };

        Ok(Self {
            config,
            enlistment,
            process,
            tracer,
        })
    }
}

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let session = Session::open(
        cli.config.as_deref(),
        cli.repo.as_deref(),
        cli.event_log.as_deref(),
    )?;

    match cli.command {
        Command::Version => version::cmd_version(&session),
        Command::Config(config_cmd) => config::dispatch_config(&session, config_cmd),
        Command::Credential(credential_cmd) => credential::dispatch_credential(&session, credential_cmd),
        Command::Run(args) => run::cmd_run(&session, args),
    }
}
