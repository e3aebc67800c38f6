//! Launch descriptors: everything needed to start one git process.
//!
//! A descriptor is composed as command text (the way git usage is written)
//! and split into argv with `shell-words` only when the process is built.
//! Caller-supplied values must go through [`quote`] when composing text.

use crate::platform;
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Config key that lets git fetch missing objects through the helper.
pub const USE_GVFS_HELPER_CONFIG: &str = "core.useGvfsHelper";

const TRACE_VARIABLE_PREFIX: &str = "GIT_TRACE";

/// Quote a value so it survives splitting as a single argument.
pub fn quote(value: &str) -> Cow<'_, str> {
    shell_words::quote(value)
}

/// Quote a path so it survives splitting as a single argument.
pub fn quote_path(path: &Path) -> String {
    shell_words::quote(&path.to_string_lossy()).into_owned()
}

/// How to start one git process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchDescriptor {
    /// git arguments as command text, without the executable.
    pub command: String,
    pub working_directory: PathBuf,
    /// Passed as `--git-dir`.
    pub git_dir: Option<PathBuf>,
    /// Exported as `GIT_OBJECT_DIRECTORY`.
    pub object_directory: Option<PathBuf>,
    /// When false, `-c core.useGvfsHelper=false` is prepended.
    pub fetch_missing_objects: bool,
    /// When false, credential managers are told never to prompt.
    pub interactive: bool,
    /// Start git below normal scheduling priority.
    pub lower_priority: bool,
}

/// Environment changes applied on top of the inherited environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentPlan {
    pub remove: Vec<OsString>,
    pub set: Vec<(&'static str, String)>,
}

impl LaunchDescriptor {
    pub fn new(command: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_directory: working_directory.into(),
            git_dir: None,
            object_directory: None,
            fetch_missing_objects: false,
            interactive: true,
            lower_priority: false,
        }
    }

    pub fn git_dir(mut self, git_dir: Option<PathBuf>) -> Self {
        self.git_dir = git_dir;
        self
    }

    pub fn object_directory(mut self, object_directory: Option<PathBuf>) -> Self {
        self.object_directory = object_directory;
        self
    }

    pub fn fetch_missing_objects(mut self, fetch: bool) -> Self {
        self.fetch_missing_objects = fetch;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn lower_priority(mut self, lower_priority: bool) -> Self {
        self.lower_priority = lower_priority;
        self
    }

    /// The full argument text, including the prefixes this layer adds.
    pub fn command_line(&self) -> String {
        let mut command = self.command.clone();

        if !self.fetch_missing_objects {
            command = format!("-c {}=false {}", USE_GVFS_HELPER_CONFIG, command);
        }

        if let Some(git_dir) = &self.git_dir {
            command = format!("--git-dir={} {}", quote_path(git_dir), command);
        }

        command
    }

    /// [`command_line`](Self::command_line) split into argv.
    pub fn arguments(&self) -> Result<Vec<String>, String> {
        let line = self.command_line();
        shell_words::split(&line).map_err(|e| format!("could not parse git command '{}': {}", line, e))
    }

    /// Environment changes for an inherited environment.
    ///
    /// `GIT_TRACE*` variables are dropped unless they point at an absolute
    /// path: any other value makes git write trace output to stdout or
    /// stderr, where it would corrupt the output being parsed.
    pub fn environment<I>(&self, inherited: I) -> EnvironmentPlan
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut plan = EnvironmentPlan::default();

        for (key, value) in inherited {
            let is_trace = key
                .to_str()
                .and_then(|k| k.get(..TRACE_VARIABLE_PREFIX.len()))
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(TRACE_VARIABLE_PREFIX));
            if is_trace && !Path::new(&value).is_absolute() {
                plan.remove.push(key);
            }
        }

        plan.set.push(("GIT_TERMINAL_PROMPT", "0".to_string()));
        plan.set.push(("GCM_VALIDATE", "0".to_string()));

        if !self.interactive {
            plan.set.push(("GCM_INTERACTIVE", "Never".to_string()));
        }

        if let Some(object_directory) = &self.object_directory {
            plan.set.push((
                "GIT_OBJECT_DIRECTORY",
                platform::convert_path_to_git_format(object_directory),
            ));
        }

        plan
    }

    /// Build the process with all three standard streams piped.
    pub fn build_command(&self, git_bin_path: &Path) -> Result<Command, String> {
        let mut command = platform::command_with_priority(git_bin_path, self.lower_priority);
        command
            .args(self.arguments()?)
            .current_dir(&self.working_directory)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let plan = self.environment(std::env::vars_os());
        for key in &plan.remove {
            command.env_remove(key);
        }
        for (key, value) in &plan.set {
            command.env(key, value);
        }

        platform::isolate_process_group(&mut command);
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        pairs
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    #[test]
    fn test_command_line_disables_helper_by_default() {
        let launch = LaunchDescriptor::new("remote", "/");
        assert_eq!(launch.command_line(), "-c core.useGvfsHelper=false remote");
    }

    #[test]
    fn test_command_line_with_fetch_allowed_is_unchanged() {
        let launch = LaunchDescriptor::new("checkout -f main", "/").fetch_missing_objects(true);
        assert_eq!(launch.command_line(), "checkout -f main");
    }

    #[test]
    fn test_git_dir_is_outermost_prefix() {
        let launch = LaunchDescriptor::new("config --local core.foo", "/")
            .git_dir(Some(PathBuf::from("/repo with space/.git")));
        assert_eq!(
            launch.arguments().unwrap(),
            vec![
                "--git-dir=/repo with space/.git",
                "-c",
                "core.useGvfsHelper=false",
                "config",
                "--local",
                "core.foo",
            ]
        );
    }

    #[test]
    fn test_arguments_honour_quotes() {
        let launch = LaunchDescriptor::new(
            format!("config --local {} {}", quote("a.b"), quote("it's a value")),
            "/",
        )
        .fetch_missing_objects(true);
        assert_eq!(
            launch.arguments().unwrap(),
            vec!["config", "--local", "a.b", "it's a value"]
        );
    }

    #[test]
    fn test_unbalanced_quotes_are_reported() {
        let launch = LaunchDescriptor::new("config \"unterminated", "/");
        let err = launch.arguments().unwrap_err();
        assert!(err.contains("could not parse git command"));
    }

    #[test]
    fn test_environment_removes_relative_trace_variables() {
        let launch = LaunchDescriptor::new("status", "/");
        let plan = launch.environment(env(&[
            ("GIT_TRACE", "1"),
            ("git_trace_packet", "2"),
            ("GIT_TRACE_PERFORMANCE", "/tmp/perf.log"),
            ("GIT_DIR", "/elsewhere"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(
            plan.remove,
            vec![OsString::from("GIT_TRACE"), OsString::from("git_trace_packet")]
        );
    }

    #[test]
    fn test_environment_disables_prompts() {
        let plan = LaunchDescriptor::new("status", "/").environment(Vec::new());
        assert!(plan.set.contains(&("GIT_TERMINAL_PROMPT", "0".to_string())));
        assert!(plan.set.contains(&("GCM_VALIDATE", "0".to_string())));
        assert!(!plan.set.iter().any(|(k, _)| *k == "GCM_INTERACTIVE"));
    }

    #[test]
    fn test_environment_non_interactive_sets_gcm_interactive() {
        let plan = LaunchDescriptor::new("fetch origin", "/")
            .interactive(false)
            .environment(Vec::new());
        assert!(plan.set.contains(&("GCM_INTERACTIVE", "Never".to_string())));
    }

    #[test]
    fn test_environment_exports_object_directory_in_git_format() {
        let plan = LaunchDescriptor::new("prune-packed -q", "/")
            .object_directory(Some(PathBuf::from(r"C:\repo\.git\objects")))
            .environment(Vec::new());
        assert!(plan
            .set
            .contains(&("GIT_OBJECT_DIRECTORY", "C:/repo/.git/objects".to_string())));
    }
}
