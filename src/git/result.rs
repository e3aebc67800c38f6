//! The outcome of one git invocation.

use crate::error::GitBridgeError;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// git ran and exited on its own; the exit code is git's.
    Completed,
    /// git could not be started.
    LaunchFailed,
    /// git was killed after exceeding its timeout.
    TimedOut,
    /// The process was stopping; git was not started or was killed.
    Stopped,
    /// Writing git's stdin or waiting on git failed; git was killed.
    IoFailed,
}

/// Captured output and exit code of a git invocation.
///
/// `stdout` is empty when stdout was handed to a line callback instead of
/// being buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub kind: ResultKind,
}

impl GitResult {
    pub const SUCCESS_CODE: i32 = 0;
    /// Reserved code for failures that happen inside this layer.
    pub const GENERIC_FAILURE_CODE: i32 = 1;

    /// Result of a process that ran to completion.
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            kind: ResultKind::Completed,
        }
    }

    /// Failure produced by this layer rather than by git.
    pub(crate) fn failure(kind: ResultKind, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Self::GENERIC_FAILURE_CODE,
            kind,
        }
    }

    pub fn exit_code_is_success(&self) -> bool {
        self.exit_code == Self::SUCCESS_CODE
    }

    pub fn exit_code_is_failure(&self) -> bool {
        !self.exit_code_is_success()
    }

    /// Whether stderr holds anything other than `warning:` lines.
    pub fn stderr_contains_errors(&self) -> bool {
        if self.stderr.trim().is_empty() {
            return false;
        }

        !self
            .stderr
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .all(is_warning_line)
    }

    /// The typed error for a failed invocation, `None` on success.
    pub fn to_error(&self) -> Option<GitBridgeError> {
        if self.exit_code_is_success() {
            return None;
        }

        let message = self.stderr.trim_end().to_string();
        Some(match self.kind {
            ResultKind::LaunchFailed => GitBridgeError::Launch(message),
            ResultKind::TimedOut => GitBridgeError::Timeout(message),
            ResultKind::Stopped => GitBridgeError::Stopping(message),
            ResultKind::IoFailed => GitBridgeError::Io(message),
            ResultKind::Completed => GitBridgeError::ExternalTool(if message.is_empty() {
                format!("git exited with code {}", self.exit_code)
            } else {
                message
            }),
        })
    }

    /// `Ok(self)` on success, the typed error otherwise.
    pub fn into_checked(self) -> Result<Self, GitBridgeError> {
        match self.to_error() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

fn is_warning_line(line: &str) -> bool {
    let line = line.trim_start();
    line.get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("warning:"))
}
