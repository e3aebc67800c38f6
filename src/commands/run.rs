//! Implementation of the `gitbridge run` command.

use super::Session;
use crate::cli::RunArgs;
use gitbridge::error::{GitBridgeError, Result};
use gitbridge::git::{GitResult, InvocationRequest, ResultKind};
use std::time::Duration;
use tracing::debug;

/// Execute the `gitbridge run` command.
///
/// git's own output is echoed when git ran; failures of this layer
/// (launch, timeout, stop) are reported as the error instead.
pub fn cmd_run(session: &Session, args: RunArgs) -> Result<()> {
    let command = shell_words::join(&args.args);
    let launch = if args.git_dir {
        session.process.against_dot_git_folder(command)
    } else {
        session.process.in_working_directory_root(command, true)
    };
    debug!(command = %launch.command_line(), "running git");

    let mut request = InvocationRequest::new(launch);
    if let Some(secs) = args.timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }

    let result = session.process.invoke(request);
    if result.kind == ResultKind::Completed {
        print!("{}", result.stdout);
        eprint!("{}", result.stderr);
    }

    check(&result)
}

fn check(result: &GitResult) -> Result<()> {
    match (result.kind, result.to_error()) {
        (_, None) => Ok(()),
        (ResultKind::Completed, Some(_)) => Err(GitBridgeError::ExternalTool(format!(
            "git exited with code {}",
            result.exit_code
        ))),
        (_, Some(err)) => Err(err),
    }
}
