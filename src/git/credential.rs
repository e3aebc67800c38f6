//! git's credential-helper protocol: fill, approve, reject.
//!
//! Requests are `key=value` lines on stdin terminated by a blank line;
//! answers come back the same way on stdout. Only the fields this layer
//! needs are parsed, through [`LineScanner`].

use crate::error::{GitBridgeError, Result};
use crate::git::invoke::InvocationRequest;
use crate::git::process::GitProcess;
use crate::git::result::GitResult;
use crate::git::scan::LineScanner;
use crate::trace::{Activity, EventMetadata, Tracer};
use serde_json::Value;
use std::fmt;
use std::io::Write;

const USERNAME_PREFIX: &str = "username=";
const PASSWORD_PREFIX: &str = "password=";

/// A username and password returned by a credential helper.
///
/// Never persisted by this crate. `Debug` does not print the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credential {
    /// Read `username=` and `password=` from helper output.
    ///
    /// # Errors
    ///
    /// `IncompleteCredential` naming the first missing field. The username is
    /// carried along when it was present.
    pub fn parse(output: &str) -> Result<Self> {
        let username = LineScanner::new(output).value_of(USERNAME_PREFIX);
        let password = LineScanner::new(output).value_of(PASSWORD_PREFIX);

        match (username, password) {
            (Some(username), Some(password)) => Ok(Self {
                username: username.to_string(),
                password: password.to_string(),
            }),
            (None, _) => Err(GitBridgeError::IncompleteCredential {
                missing: "username",
                username: None,
            }),
            (Some(username), None) => Err(GitBridgeError::IncompleteCredential {
                missing: "password",
                username: Some(username.to_string()),
            }),
        }
    }
}

/// Somewhere credentials can be fetched from, saved to, and removed from.
pub trait CredentialStore {
    /// Ask the helpers for a credential for `repo_url`.
    fn try_get_credential(&self, tracer: &dyn Tracer, repo_url: &str) -> Result<Credential>;

    /// Tell the helpers that a credential worked.
    fn try_store_credential(
        &self,
        tracer: &dyn Tracer,
        repo_url: &str,
        username: &str,
        password: &str,
    ) -> Result<()>;

    /// Tell the helpers that a credential was rejected.
    fn try_delete_credential(
        &self,
        tracer: &dyn Tracer,
        repo_url: &str,
        username: &str,
        password: &str,
    ) -> Result<()>;
}

/// Command text for a credential verb.
pub fn credential_verb_command(verb: &str) -> String {
    format!("-c credential.useHttpPath=true credential {}", verb)
}

/// Stdin for `credential fill`.
pub fn fill_input(repo_url: &str) -> String {
    format!("url={}\n\n", repo_url)
}

/// Stdin for `credential approve`.
pub fn approve_input(repo_url: &str, username: &str, password: &str) -> String {
    format!(
        "url={}\nusername={}\npassword={}\n\n",
        repo_url, username, password
    )
}

/// Stdin for `credential reject`.
///
/// Only the url is sent. Some helpers keep a credential obtained for a url
/// when asked to erase it with a username and password attached.
pub fn reject_input(repo_url: &str) -> String {
    format!("url={}\n\n", repo_url)
}

/// Stdin for a certificate-password fill.
pub fn certificate_input(certificate_path: &str) -> String {
    format!("protocol=cert\npath={}\nusername=\n\n", certificate_path)
}

impl GitProcess {
    /// Ask the helpers for the password protecting a client certificate.
    ///
    /// # Errors
    ///
    /// The helper's failure when git exits non-zero, or
    /// `IncompleteCredential` when no `password=` line came back.
    pub fn try_get_certificate_password(
        &self,
        tracer: &dyn Tracer,
        certificate_path: &str,
    ) -> Result<String> {
        let activity = Activity::start(tracer, "TryGetCertificatePassword");
        let input = certificate_input(certificate_path);
        let result = self.invoke(
            InvocationRequest::new(self.against_dot_git_folder("credential fill"))
                .with_stdin(move |stdin: &mut dyn Write| stdin.write_all(input.as_bytes())),
        );

        if result.exit_code_is_failure() {
            let mut metadata = EventMetadata::new();
            metadata.insert("CertificatePath".to_string(), Value::from(certificate_path));
            tracer.related_warning(
                metadata,
                &format!("Git could not get credentials: {}", result.stderr),
            );
            return Err(helper_error(&result));
        }

        let password = LineScanner::new(&result.stdout).value_of(PASSWORD_PREFIX);

        let mut metadata = EventMetadata::new();
        metadata.insert("Success".to_string(), Value::from(password.is_some()));
        metadata.insert("CertificatePath".to_string(), Value::from(certificate_path));
        if password.is_none() {
            metadata.insert("Output".to_string(), Value::from(redact(&result.stdout)));
        }
        activity.stop(metadata);

        password
            .map(str::to_string)
            .ok_or(GitBridgeError::IncompleteCredential {
                missing: "password",
                username: None,
            })
    }

    fn run_credential_update(
        &self,
        tracer: &dyn Tracer,
        verb: &str,
        input: String,
    ) -> Result<()> {
        let result = self.invoke(
            InvocationRequest::new(self.outside_enlistment(credential_verb_command(verb)))
                .with_stdin(move |stdin: &mut dyn Write| stdin.write_all(input.as_bytes())),
        );

        if result.exit_code_is_failure() {
            tracer.related_warning(
                EventMetadata::new(),
                &format!("Git could not {} credentials: {}", verb, result.stderr),
            );
            return Err(helper_error(&result));
        }

        Ok(())
    }
}

impl CredentialStore for GitProcess {
    fn try_get_credential(&self, tracer: &dyn Tracer, repo_url: &str) -> Result<Credential> {
        let activity = Activity::start(tracer, "TryGetCredential");
        let input = fill_input(repo_url);
        let result = self.invoke(
            InvocationRequest::new(self.against_dot_git_folder(credential_verb_command("fill")))
                .with_stdin(move |stdin: &mut dyn Write| stdin.write_all(input.as_bytes())),
        );

        if result.exit_code_is_failure() {
            tracer.related_warning(
                EventMetadata::new(),
                &format!("Git could not get credentials: {}", result.stderr),
            );
            return Err(helper_error(&result));
        }

        let credential = Credential::parse(&result.stdout);

        let mut metadata = EventMetadata::new();
        metadata.insert("Success".to_string(), Value::from(credential.is_ok()));
        if credential.is_err() {
            metadata.insert("Output".to_string(), Value::from(redact(&result.stdout)));
        }
        activity.stop(metadata);

        credential
    }

    fn try_store_credential(
        &self,
        tracer: &dyn Tracer,
        repo_url: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        self.run_credential_update(tracer, "approve", approve_input(repo_url, username, password))
    }

    fn try_delete_credential(
        &self,
        tracer: &dyn Tracer,
        repo_url: &str,
        _username: &str,
        _password: &str,
    ) -> Result<()> {
        self.run_credential_update(tracer, "reject", reject_input(repo_url))
    }
}

fn helper_error(result: &GitResult) -> GitBridgeError {
    result
        .to_error()
        .unwrap_or_else(|| GitBridgeError::ExternalTool(result.stderr.clone()))
}

/// Helper output with password values blanked, for trace metadata.
fn redact(output: &str) -> String {
    LineScanner::new(output)
        .map(|line| {
            if line.starts_with(PASSWORD_PREFIX) {
                format!("{}<redacted>\n", PASSWORD_PREFIX)
            } else {
                format!("{}\n", line)
            }
        })
        .collect()
}
