//! Error types for gitbridge.
//!
//! Uses thiserror for derive macros. Invocation failures travel inside
//! [`GitResult`](crate::git::GitResult); these variants are what callers get
//! when they ask for a typed interpretation of a result.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for gitbridge operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitBridgeError {
    /// User provided invalid arguments or settings.
    #[error("{0}")]
    UserError(String),

    /// The git executable could not be started.
    #[error("Failed to launch git: {0}")]
    Launch(String),

    /// Writing git's stdin or waiting for git failed.
    #[error("{0}")]
    Io(String),

    /// The invocation exceeded its timeout and was killed.
    #[error("{0}")]
    Timeout(String),

    /// The process was marked as stopping before or during the invocation.
    #[error("{0}")]
    Stopping(String),

    /// git exited with a failure code and reported errors.
    #[error("{0}")]
    ExternalTool(String),

    /// A config value could not be interpreted as the requested type.
    #[error("{0}")]
    ConfigType(String),

    /// The credential helper answered without a required field.
    ///
    /// The password is never carried here; `username` is whatever was parsed.
    #[error("credential helper did not return a {missing}")]
    IncompleteCredential {
        missing: &'static str,
        username: Option<String>,
    },
}

impl GitBridgeError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GitBridgeError::UserError(_) => exit_codes::USER_ERROR,
            GitBridgeError::Launch(_) | GitBridgeError::Io(_) => exit_codes::GENERIC_FAILURE,
            GitBridgeError::Timeout(_) | GitBridgeError::Stopping(_) => exit_codes::INTERRUPTED,
            GitBridgeError::ExternalTool(_) => exit_codes::GIT_FAILURE,
            GitBridgeError::ConfigType(_) => exit_codes::CONFIG_FAILURE,
            GitBridgeError::IncompleteCredential { .. } => exit_codes::CREDENTIAL_FAILURE,
        }
    }
}

/// Result type alias for gitbridge operations.
pub type Result<T> = std::result::Result<T, GitBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = GitBridgeError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn interrupted_errors_share_exit_code() {
        let timeout = GitBridgeError::Timeout("Operation timed out: ".to_string());
        let stopping = GitBridgeError::Stopping("GitProcess is stopping".to_string());
        assert_eq!(timeout.exit_code(), exit_codes::INTERRUPTED);
        assert_eq!(stopping.exit_code(), exit_codes::INTERRUPTED);
    }

    #[test]
    fn config_and_credential_errors_have_correct_exit_codes() {
        let err = GitBridgeError::ConfigType("bad int".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_FAILURE);

        let err = GitBridgeError::IncompleteCredential {
            missing: "password",
            username: Some("bob".to_string()),
        };
        assert_eq!(err.exit_code(), exit_codes::CREDENTIAL_FAILURE);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = GitBridgeError::Launch("No such file or directory".to_string());
        assert_eq!(err.to_string(), "Failed to launch git: No such file or directory");

        let err = GitBridgeError::IncompleteCredential {
            missing: "password",
            username: None,
        };
        assert_eq!(err.to_string(), "credential helper did not return a password");
    }
}
