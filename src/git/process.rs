//! The git process handle: one instance per enlistment (or per caller).

use crate::config::Config;
use crate::enlistment::Enlistment;
use crate::error::Result;
use crate::git::gate::{CancellationGate, KillReport};
use crate::git::invoke::InvocationRequest;
use crate::git::launch::LaunchDescriptor;
use crate::git::result::GitResult;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Runs git commands for one enlistment, one at a time.
///
/// Every invocation holds the execution lock for its whole duration, so
/// concurrent callers on the same instance serialize. Separate instances run
/// fully in parallel. [`kill_running_process`](Self::kill_running_process)
/// may be called from any thread while an invocation is in flight.
#[derive(Debug)]
pub struct GitProcess {
    git_bin_path: PathBuf,
    working_directory_root: Option<PathBuf>,
    dot_git_root: Option<PathBuf>,
    system_directory: PathBuf,
    stdin_available: bool,
    default_timeout: Option<Duration>,
    lower_priority: bool,
    pub(crate) poll_interval: Duration,
    pub(crate) execution_lock: Mutex<()>,
    pub(crate) gate: CancellationGate,
}

impl GitProcess {
    /// Create a process for `working_directory_root`, or for no repository.
    ///
    /// # Errors
    ///
    /// `UserError` if `config` does not pass [`Config::validate`].
    pub fn new(config: &Config, working_directory_root: Option<PathBuf>) -> Result<Self> {
        config.validate()?;

        let dot_git_root = working_directory_root
            .as_ref()
            .map(|root| root.join(Enlistment::DOT_GIT));

        Ok(Self {
            git_bin_path: PathBuf::from(&config.git_bin_path),
            working_directory_root,
            dot_git_root,
            system_directory: config.system_directory(),
            stdin_available: config.stdin_available,
            default_timeout: config.timeout(),
            lower_priority: config.lower_priority,
            poll_interval: config.poll_interval(),
            execution_lock: Mutex::new(()),
            gate: CancellationGate::new(),
        })
    }

    /// Create a process for an enlistment, using the enlistment's git.
    pub fn for_enlistment(enlistment: &Enlistment, config: &Config) -> Result<Self> {
        let config = Config {
            git_bin_path: enlistment.git_bin_path.to_string_lossy().to_string(),
            ..config.clone()
        };
        Self::new(&config, Some(enlistment.working_directory_root().to_path_buf()))
    }

    pub fn git_bin_path(&self) -> &Path {
        &self.git_bin_path
    }

    pub fn working_directory_root(&self) -> Option<&Path> {
        self.working_directory_root.as_deref()
    }

    pub fn dot_git_root(&self) -> Option<&Path> {
        self.dot_git_root.as_deref()
    }

    pub(crate) fn stdin_available(&self) -> bool {
        self.stdin_available
    }

    pub(crate) fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Whether git is started below normal priority.
    pub fn lower_priority(&self) -> bool {
        self.lower_priority
    }

    /// Start every later invocation below (or back at) normal priority.
    pub fn set_lower_priority(&mut self, lower_priority: bool) {
        self.lower_priority = lower_priority;
    }

    /// Name reported when the running process is killed.
    pub fn process_name(&self) -> String {
        self.git_bin_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "git".to_string())
    }

    /// Fail every future invocation on this instance without spawning.
    pub fn mark_stopping(&self) {
        self.gate.mark_stopping();
    }

    pub fn is_stopping(&self) -> bool {
        self.gate.is_stopping()
    }

    /// Whether a git process is running right now.
    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Stop this instance and kill the process it is running, if any.
    ///
    /// Only use this on git commands that can be safely interrupted.
    pub fn kill_running_process(&self) -> KillReport {
        self.gate.kill_running_process()
    }

    /// Run a launch descriptor with buffered stdout and no stdin.
    pub fn run(&self, launch: LaunchDescriptor) -> GitResult {
        self.invoke(InvocationRequest::new(launch))
    }

    /// For commands git can't (or needn't) run inside an enlistment,
    /// e.g. `init` or `--version`. Runs in the system directory.
    pub fn outside_enlistment(&self, command: impl Into<String>) -> LaunchDescriptor {
        LaunchDescriptor::new(command, &self.system_directory)
    }

    /// For commands that operate on the working tree. Runs in the
    /// enlistment root (the current directory when there is none).
    pub fn in_working_directory_root(
        &self,
        command: impl Into<String>,
        fetch_missing_objects: bool,
    ) -> LaunchDescriptor {
        let working_directory = self
            .working_directory_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        LaunchDescriptor::new(command, working_directory).fetch_missing_objects(fetch_missing_objects)
    }

    /// For commands that ignore the working tree. Runs in the system
    /// directory with `--git-dir` pointing at the enlistment's `.git`, so
    /// git never touches the working tree.
    pub fn against_dot_git_folder(&self, command: impl Into<String>) -> LaunchDescriptor {
        LaunchDescriptor::new(command, &self.system_directory).git_dir(self.dot_git_root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitBridgeError;

    #[test]
    fn test_blank_git_path_rejected() {
        let err = GitProcess::new(&Config::with_git_bin_path("  "), None).unwrap_err();
        assert!(matches!(err, GitBridgeError::UserError(_)));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        let err = GitProcess::new(&config, None).unwrap_err();
        assert!(matches!(err, GitBridgeError::UserError(_)));
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn test_lower_priority_from_config_and_setter() {
        let config = Config {
            lower_priority: true,
            ..Config::default()
        };
        let mut process = GitProcess::new(&config, None).unwrap();
        assert!(process.lower_priority());

        process.set_lower_priority(false);
        assert!(!process.lower_priority());
    }

    #[test]
    fn test_dot_git_root_derived_from_working_directory() {
        let process = GitProcess::new(&Config::default(), Some(PathBuf::from("/src/repo"))).unwrap();
        assert_eq!(process.working_directory_root(), Some(Path::new("/src/repo")));
        assert_eq!(process.dot_git_root(), Some(Path::new("/src/repo/.git")));
    }

    #[test]
    fn test_for_enlistment_uses_enlistment_git() {
        let enlistment = Enlistment::new("/src/repo", "/opt/git/bin/git");
        let process = GitProcess::for_enlistment(&enlistment, &Config::default()).unwrap();
        assert_eq!(process.git_bin_path(), Path::new("/opt/git/bin/git"));
        assert_eq!(process.dot_git_root(), Some(Path::new("/src/repo/.git")));
    }

    #[test]
    fn test_process_name_is_executable_stem() {
        let process = GitProcess::new(&Config::with_git_bin_path("/usr/bin/git"), None).unwrap();
        assert_eq!(process.process_name(), "git");
    }

    #[test]
    fn test_placements() {
        let config = Config {
            system_directory: Some("/sys-dir".to_string()),
            ..Config::default()
        };
        let process = GitProcess::new(&config, Some(PathBuf::from("/src/repo"))).unwrap();

        let outside = process.outside_enlistment("--version");
        assert_eq!(outside.working_directory, PathBuf::from("/sys-dir"));
        assert_eq!(outside.git_dir, None);

        let working = process.in_working_directory_root("checkout -f main", true);
        assert_eq!(working.working_directory, PathBuf::from("/src/repo"));
        assert!(working.fetch_missing_objects);

        let dot_git = process.against_dot_git_folder("config --local core.foo");
        assert_eq!(dot_git.working_directory, PathBuf::from("/sys-dir"));
        assert_eq!(dot_git.git_dir, Some(PathBuf::from("/src/repo/.git")));
        assert!(!dot_git.fetch_missing_objects);
    }

    #[test]
    fn test_kill_with_nothing_running() {
        let process = GitProcess::new(&Config::default(), None).unwrap();
        let report = process.kill_running_process();
        assert!(report.success);
        assert_eq!(report.process_name, None);
        assert!(process.is_stopping());
    }
}
