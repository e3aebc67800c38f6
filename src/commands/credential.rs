//! Implementation of the `gitbridge credential` commands.
//!
//! Output follows git's credential format (`key=value` lines) so it can be
//! piped into other credential tooling.

use super::Session;
use crate::cli::{CredentialAction, CredentialCommand};
use gitbridge::error::{GitBridgeError, Result};
use gitbridge::git::{Credential, CredentialStore};
use std::io::BufRead;

/// Dispatch credential subcommands.
pub fn dispatch_credential(session: &Session, credential_cmd: CredentialCommand) -> Result<()> {
    let tracer = session.tracer.as_ref();

    match credential_cmd.action {
        CredentialAction::Fill(args) => {
            let credential = session.process.try_get_credential(tracer, &args.url)?;
            print!("{}", format_credential(&credential));
            Ok(())
        }
        CredentialAction::Approve(args) => {
            let password = read_password(std::io::stdin().lock())?;
            session
                .process
                .try_store_credential(tracer, &args.url, &args.username, &password)
        }
        CredentialAction::Reject(args) => session.process.try_delete_credential(tracer, &args.url, "", ""),
        CredentialAction::Cert(args) => {
            let password = session
                .process
                .try_get_certificate_password(tracer, &args.path)?;
            println!("password={}", password);
            Ok(())
        }
    }
}

/// `username=` and `password=` lines.
pub fn format_credential(credential: &Credential) -> String {
    format!(
        "username={}\npassword={}\n",
        credential.username, credential.password
    )
}

/// First line of `reader`, without its terminator.
fn read_password<R: BufRead>(mut reader: R) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| GitBridgeError::UserError(format!("failed to read password from stdin: {}", e)))?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(GitBridgeError::UserError(
            "expected a password on stdin".to_string(),
        ));
    }
    Ok(password.to_string())
}
