use crate::config::Config;
use crate::git::GitProcess;
use crate::trace::{TraceEvent, TraceLevel, Tracer};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tempfile::TempDir;

/// Tracer that keeps every record in memory.
#[derive(Debug, Default)]
pub(crate) struct RecordingTracer {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingTracer {
    pub(crate) fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    pub(crate) fn warnings(&self) -> Vec<TraceEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == TraceLevel::Warning)
            .collect()
    }
}

impl Tracer for RecordingTracer {
    fn record(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(event);
    }
}

/// A stand-in git executable: a shell script written into a temp dir.
///
/// The script body receives git's argv as `"$@"` and its stdin, so tests can
/// script exactly what "git" prints and how it exits.
#[cfg(unix)]
pub(crate) struct FakeGit {
    pub(crate) dir: TempDir,
    pub(crate) path: PathBuf,
}

#[cfg(unix)]
impl FakeGit {
    pub(crate) fn new(body: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake-git");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        Self { dir, path }
    }

    pub(crate) fn config(&self) -> Config {
        Config {
            poll_interval_ms: 5,
            ..Config::with_git_bin_path(self.path.to_string_lossy().to_string())
        }
    }

    /// A process whose enlistment root is a directory next to the script.
    pub(crate) fn process(&self) -> GitProcess {
        let root = self.dir.path().join("enlistment");
        std::fs::create_dir_all(&root).unwrap();
        GitProcess::new(&self.config(), Some(root)).unwrap()
    }

    /// A process with no enlistment.
    pub(crate) fn process_outside(&self) -> GitProcess {
        GitProcess::new(&self.config(), None).unwrap()
    }

    /// Path inside the script's temp dir, for scripts that record input.
    pub(crate) fn scratch(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Initialize a real repository for tests that exercise the actual git CLI.
pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);

    temp_dir
}

fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }
}
