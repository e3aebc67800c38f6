//! gitbridge: a subprocess bridge to the git CLI.
//!
//! [`git::GitProcess`] runs git for one enlistment with concurrent output
//! draining, timeouts, and cross-thread cancellation. On top of it sit the
//! credential-helper protocol ([`git::CredentialStore`]), config result
//! parsing ([`git::ConfigResult`]), and the command set in
//! [`git::GitProcess`]'s methods.

pub mod config;
pub mod enlistment;
pub mod error;
pub mod exit_codes;
pub mod git;
pub mod logging;
pub mod platform;
pub mod trace;

#[cfg(test)]
mod test_support;
