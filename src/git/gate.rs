//! Cancellation gate: the running-process slot and the stopping flag.
//!
//! # Locking
//!
//! The slot is a `Mutex<Option<RunningProcess>>`. It is held only for short
//! critical sections: the stopping check plus spawn, each exit poll, and a
//! kill request. Reaping the child happens only under this lock, so a kill
//! always targets either a live process or an unreaped zombie, never a
//! recycled pid.
//!
//! The stopping flag is an `AtomicBool` set before the kill path takes the
//! lock and read under the lock at spawn. A kill racing a start therefore
//! either finds nothing (and the starter then sees the flag and aborts) or
//! finds the started child and kills it.

use crate::platform::{self, KillStatus};
use std::io;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// The child currently owned by a gate.
#[derive(Debug)]
struct RunningProcess {
    child: Child,
    name: String,
}

/// Pipes of a freshly started child. The child itself stays in the gate.
#[derive(Debug)]
pub(crate) struct StartedProcess {
    pub(crate) pid: u32,
    pub(crate) stdin: Option<ChildStdin>,
    pub(crate) stdout: Option<ChildStdout>,
    pub(crate) stderr: Option<ChildStderr>,
}

/// Why a start did not happen.
#[derive(Debug)]
pub(crate) enum StartError {
    Stopping,
    Launch(io::Error),
}

/// State of the child observed by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitPoll {
    Running,
    /// Exited and reaped; `None` when terminated by a signal.
    Exited(Option<i32>),
}

/// Outcome of [`CancellationGate::kill_running_process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillReport {
    /// Name of the killed process, `None` if nothing was running.
    pub process_name: Option<String>,
    /// Exit code of the platform kill, `-1` if no kill was attempted.
    pub exit_code: i32,
    pub error: Option<String>,
    pub success: bool,
}

impl KillReport {
    fn nothing_running() -> Self {
        Self {
            process_name: None,
            exit_code: -1,
            error: None,
            success: true,
        }
    }
}

/// Cross-thread stop flag plus kill-current-process primitive.
#[derive(Debug, Default)]
pub struct CancellationGate {
    stopping: AtomicBool,
    running: Mutex<Option<RunningProcess>>,
}

impl CancellationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permanently fail every future start on this gate.
    pub fn mark_stopping(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Whether a child is currently recorded.
    pub fn is_running(&self) -> bool {
        self.slot().is_some()
    }

    /// Mark stopping, then kill whatever is running.
    ///
    /// Nothing running is a successful no-op. A child that exits on its own
    /// while the kill is in flight is also reported as success.
    pub fn kill_running_process(&self) -> KillReport {
        self.mark_stopping();

        let slot = self.slot();
        let Some(process) = slot.as_ref() else {
            return KillReport::nothing_running();
        };

        let KillStatus {
            success,
            exit_code,
            error,
        } = platform::kill_process_tree(process.child.id());

        if let Some(error) = &error {
            tracing::warn!(pid = process.child.id(), name = %process.name, %error, "failed to kill git process");
        } else {
            tracing::debug!(pid = process.child.id(), name = %process.name, "killed git process");
        }

        KillReport {
            process_name: Some(process.name.clone()),
            exit_code,
            error,
            success,
        }
    }

    /// Check the stopping flag and spawn, atomically with respect to a kill.
    pub(crate) fn start(&self, command: &mut Command, name: &str) -> Result<StartedProcess, StartError> {
        let mut slot = self.slot();

        if self.is_stopping() {
            return Err(StartError::Stopping);
        }

        let mut child = command.spawn().map_err(StartError::Launch)?;
        let started = StartedProcess {
            pid: child.id(),
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
        };

        *slot = Some(RunningProcess {
            child,
            name: name.to_string(),
        });

        Ok(started)
    }

    /// Non-blocking exit check; reaps and clears the slot on exit.
    pub(crate) fn poll_exit(&self) -> io::Result<ExitPoll> {
        let mut slot = self.slot();
        let Some(process) = slot.as_mut() else {
            return Ok(ExitPoll::Exited(None));
        };

        match process.child.try_wait()? {
            Some(status) => {
                *slot = None;
                Ok(ExitPoll::Exited(status.code()))
            }
            None => Ok(ExitPoll::Running),
        }
    }

    /// Kill and reap the recorded child, if any.
    pub(crate) fn terminate(&self) {
        let mut slot = self.slot();
        if let Some(mut process) = slot.take() {
            let status = platform::kill_process_tree(process.child.id());
            if !status.success {
                // Fall back to killing just the child.
                let _ = process.child.kill();
            }
            let _ = process.child.wait();
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<RunningProcess>> {
        self.running
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Terminates the gate's child when dropped, so no path leaves one behind.
pub(crate) struct TerminateOnDrop<'a>(pub(crate) &'a CancellationGate);

impl Drop for TerminateOnDrop<'_> {
    fn drop(&mut self) {
        self.0.terminate();
    }
}
