//! Implementation of the `gitbridge version` command.

use super::Session;
use gitbridge::error::Result;
use gitbridge::git::GitProcess;

/// Execute the `gitbridge version` command.
pub fn cmd_version(session: &Session) -> Result<()> {
    let version = GitProcess::try_get_version(&session.config)?;
    println!("git {}", version);
    Ok(())
}
