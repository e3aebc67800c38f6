//! Exit code constants for the gitbridge CLI.
//!
//! - 0: Success
//! - 1: Generic failure (also the reserved code for internal invocation failures)
//! - 2: User error (bad args, invalid settings)
//! - 3: git reported a failure
//! - 4: Config value could not be interpreted
//! - 5: Credential exchange failed
//! - 6: Invocation timed out or was stopped

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Generic failure: launch errors and other internal invocation failures.
pub const GENERIC_FAILURE: i32 = 1;

/// User error: bad arguments or invalid settings file.
pub const USER_ERROR: i32 = 2;

/// git exited with a failure and reported errors on stderr.
pub const GIT_FAILURE: i32 = 3;

/// A config value was missing its required shape (non-numeric, out of range).
pub const CONFIG_FAILURE: i32 = 4;

/// The credential helper exchange did not produce the expected fields.
pub const CREDENTIAL_FAILURE: i32 = 5;

/// The invocation timed out or the process was stopped.
pub const INTERRUPTED: i32 = 6;
