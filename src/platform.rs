//! Platform services used by the git invoker.
//!
//! Process-tree termination, the directory used for commands that must run
//! outside any repository, path normalization for git, and the filesystem
//! seam used when choosing where a config query runs.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Outcome of a process-tree kill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillStatus {
    /// Whether the tree is gone (including "it was already gone").
    pub success: bool,
    /// Exit code of the platform kill tool, `-1` if it never ran.
    pub exit_code: i32,
    /// Error text when the kill did not succeed.
    pub error: Option<String>,
}

impl KillStatus {
    fn ok(exit_code: i32) -> Self {
        Self {
            success: true,
            exit_code,
            error: None,
        }
    }

    fn failed(exit_code: i32, error: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code,
            error: Some(error.into()),
        }
    }
}

/// Niceness added for below-normal priority on Unix.
#[cfg(unix)]
const BELOW_NORMAL_NICENESS: &str = "10";

/// `BELOW_NORMAL_PRIORITY_CLASS` process creation flag.
#[cfg(windows)]
const BELOW_NORMAL_PRIORITY_CLASS: u32 = 0x0000_4000;

/// A command for `program`, started below normal priority when
/// `lower_priority` is set.
///
/// On Unix the program is run through `nice`, which execs it in place, so
/// the spawned pid is still the program's own.
pub fn command_with_priority(program: &Path, lower_priority: bool) -> Command {
    if !lower_priority {
        return Command::new(program);
    }

    #[cfg(unix)]
    {
        let mut command = Command::new("nice");
        command.args(["-n", BELOW_NORMAL_NICENESS]).arg(program);
        command
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        let mut command = Command::new(program);
        command.creation_flags(BELOW_NORMAL_PRIORITY_CLASS);
        command
    }

    #[cfg(not(any(unix, windows)))]
    {
        Command::new(program)
    }
}

/// Put a command in its own process group so the whole tree can be killed.
pub fn isolate_process_group(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(not(unix))]
    {
        let _ = command;
    }
}

/// Forcibly terminate a process and all of its descendants.
///
/// On Unix the process must have been started with [`isolate_process_group`];
/// its group is sent `SIGKILL`. A process that has already exited counts as
/// killed.
pub fn kill_process_tree(pid: u32) -> KillStatus {
    #[cfg(windows)]
    {
        let output = Command::new("taskkill")
            .args(["/F", "/T", "/PID", &pid.to_string()])
            .output();
        return match output {
            Ok(output) => {
                let code = output.status.code().unwrap_or(-1);
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if output.status.success() || is_already_stopped(&stderr) {
                    KillStatus::ok(code)
                } else {
                    KillStatus::failed(code, stderr.trim())
                }
            }
            Err(e) => KillStatus::failed(-1, format!("failed to execute taskkill: {}", e)),
        };
    }

    #[cfg(not(windows))]
    {
        let send = |target: String| -> KillStatus {
            match Command::new("kill").args(["-KILL", "--", &target]).output() {
                Ok(output) => {
                    let code = output.status.code().unwrap_or(-1);
                    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                    if output.status.success() || is_already_stopped(&stderr) {
                        KillStatus::ok(code)
                    } else {
                        KillStatus::failed(code, format!("kill {} failed: {}", target, stderr.trim()))
                    }
                }
                Err(e) => KillStatus::failed(-1, format!("failed to execute kill: {}", e)),
            }
        };

        let group = send(format!("-{}", pid));
        if group.success {
            return group;
        }

        // Not a group leader (started elsewhere); fall back to the single pid.
        send(pid.to_string())
    }
}

fn is_already_stopped(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("no such process") || lower.contains("not found")
}

/// Directory for git commands that must not discover a repository.
pub fn system_directory() -> PathBuf {
    #[cfg(windows)]
    {
        let root = std::env::var("SystemRoot").unwrap_or_else(|_| r"C:\Windows".to_string());
        return PathBuf::from(root).join("System32");
    }

    #[cfg(not(windows))]
    {
        PathBuf::from("/")
    }
}

/// Convert a path to the forward-slash form git expects in environment values.
pub fn convert_path_to_git_format(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Filesystem queries the invoker depends on.
pub trait FileSystem {
    /// Whether `path` exists and is a directory.
    fn directory_exists(&self, path: &Path) -> bool;
}

/// [`FileSystem`] backed by the real disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalFileSystem;

impl FileSystem for PhysicalFileSystem {
    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
