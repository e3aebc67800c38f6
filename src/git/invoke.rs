//! Process invocation: spawn, drain, feed stdin, wait, assemble the result.
//!
//! # Draining
//!
//! stdout and stderr are each read on their own reader thread from the moment
//! the process starts. Reading only one of them would let git fill the other
//! pipe and block forever. Readers forward lines over a channel; the invoking
//! thread consumes them while it polls for exit, so line callbacks run on the
//! caller's thread.
//!
//! Readers are detached. A descendant that left git's process group can hold
//! a pipe open after git is gone; the invocation then stops waiting for EOF
//! (after a short grace period once git was killed, or at the deadline once git
//! exited) and returns the output captured so far. The reader ends on its own
//! when the descendant closes the pipe.
//!
//! # Limitations
//!
//! The stdin writer runs synchronously on the invoking thread before the
//! timeout clock starts. A writer blocked on a full stdin pipe is not
//! interrupted by the timeout.

use crate::git::gate::{ExitPoll, StartError, TerminateOnDrop};
use crate::git::launch::LaunchDescriptor;
use crate::git::process::GitProcess;
use crate::git::result::{GitResult, ResultKind};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long readers may take to reach EOF once git has been killed.
const READER_GRACE: Duration = Duration::from_millis(500);

/// Writes git's stdin. Called at most once; stdin is closed afterwards.
pub type StdinWriter<'a> = Box<dyn FnOnce(&mut dyn Write) -> io::Result<()> + 'a>;

/// Receives each stdout line (without its line terminator), on the
/// invoking thread.
pub type LineHandler<'a> = Box<dyn FnMut(&str) + 'a>;

/// What happens to git's stdout.
pub enum StdoutMode<'a> {
    /// Drain and discard.
    NoCapture,
    /// Collect into [`GitResult::stdout`], one `\n` after each line.
    BufferAll,
    /// Hand each line to a callback; [`GitResult::stdout`] stays empty.
    LineCallback(LineHandler<'a>),
}

impl std::fmt::Debug for StdoutMode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StdoutMode::NoCapture => write!(f, "NoCapture"),
            StdoutMode::BufferAll => write!(f, "BufferAll"),
            StdoutMode::LineCallback(_) => write!(f, "LineCallback(..)"),
        }
    }
}

/// One git invocation.
pub struct InvocationRequest<'a> {
    pub launch: LaunchDescriptor,
    pub stdin: Option<StdinWriter<'a>>,
    pub stdout: StdoutMode<'a>,
    /// Overrides the process default; `None` falls back to it.
    pub timeout: Option<Duration>,
}

impl<'a> InvocationRequest<'a> {
    pub fn new(launch: LaunchDescriptor) -> Self {
        Self {
            launch,
            stdin: None,
            stdout: StdoutMode::BufferAll,
            timeout: None,
        }
    }

    pub fn with_stdin<F>(mut self, writer: F) -> Self
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()> + 'a,
    {
        self.stdin = Some(Box::new(writer));
        self
    }

    pub fn with_stdout(mut self, stdout: StdoutMode<'a>) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn on_stdout_line<F>(self, handler: F) -> Self
    where
        F: FnMut(&str) + 'a,
    {
        self.with_stdout(StdoutMode::LineCallback(Box::new(handler)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How the wait ended.
enum WaitOutcome {
    Exited(Option<i32>),
    TimedOut,
    IoFailed(io::Error),
}

/// One line read from git, terminator stripped.
enum PipeLine {
    Stdout(String),
    Stderr(String),
}

/// Receives lines from the reader threads and routes them.
struct OutputCollector<'a> {
    lines: Receiver<PipeLine>,
    stdout_mode: StdoutMode<'a>,
    stdout: String,
    stderr: String,
    readers_done: bool,
}

impl<'a> OutputCollector<'a> {
    fn new(lines: Receiver<PipeLine>, stdout_mode: StdoutMode<'a>) -> Self {
        Self {
            lines,
            stdout_mode,
            stdout: String::new(),
            stderr: String::new(),
            readers_done: false,
        }
    }

    fn accept(&mut self, line: PipeLine) {
        match line {
            PipeLine::Stdout(line) => match &mut self.stdout_mode {
                StdoutMode::NoCapture => {}
                StdoutMode::BufferAll => {
                    self.stdout.push_str(&line);
                    self.stdout.push('\n');
                }
                StdoutMode::LineCallback(handler) => handler(&line),
            },
            PipeLine::Stderr(line) => {
                self.stderr.push_str(&line);
                self.stderr.push('\n');
            }
        }
    }

    /// Route whatever arrives within `wait`, then everything already queued.
    fn collect_for(&mut self, wait: Duration) {
        if self.readers_done {
            thread::sleep(wait);
            return;
        }

        match self.lines.recv_timeout(wait) {
            Ok(line) => {
                self.accept(line);
                while let Ok(line) = self.lines.try_recv() {
                    self.accept(line);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.readers_done = true,
        }
    }

    /// Route lines until both readers reach EOF or `deadline` passes.
    ///
    /// Returns false if a reader was still open at the deadline.
    fn finish(&mut self, deadline: Option<Instant>) -> bool {
        while !self.readers_done {
            let received = match deadline {
                None => self.lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.lines.recv_timeout(deadline - now)
                }
            };

            match received {
                Ok(line) => self.accept(line),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => self.readers_done = true,
            }
        }
        true
    }
}

impl GitProcess {
    /// Run one invocation to completion or timeout.
    ///
    /// Never panics on git's behalf and never returns `Err`: launch
    /// failures, timeouts, stops, and stdin or wait failures are all
    /// reported inside the [`GitResult`] with
    /// [`GitResult::GENERIC_FAILURE_CODE`].
    pub fn invoke(&self, request: InvocationRequest<'_>) -> GitResult {
        let InvocationRequest {
            launch,
            stdin,
            stdout,
            timeout,
        } = request;

        if stdin.is_some() && !self.stdin_available() {
            return GitResult::failure(
                ResultKind::LaunchFailed,
                "",
                "Attempting to use stdin, but stdin is not available to this process.",
            );
        }

        let launch = if self.lower_priority() {
            launch.lower_priority(true)
        } else {
            launch
        };
        let mut command = match launch.build_command(self.git_bin_path()) {
            Ok(command) => command,
            Err(e) => return GitResult::failure(ResultKind::LaunchFailed, "", e),
        };
        let timeout = timeout.or(self.default_timeout());

        let _execution = self
            .execution_lock
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        let started = match self.gate.start(&mut command, &self.process_name()) {
            Ok(started) => started,
            Err(StartError::Stopping) => {
                return GitResult::failure(ResultKind::Stopped, "", "GitProcess is stopping");
            }
            Err(StartError::Launch(e)) => {
                debug!(git = %self.git_bin_path().display(), error = %e, "failed to start git");
                return GitResult::failure(ResultKind::LaunchFailed, "", e.to_string());
            }
        };
        let _terminate = TerminateOnDrop(&self.gate);
        debug!(pid = started.pid, command = %launch.command_line(), "started git");

        let (sender, lines) = mpsc::channel();
        if let Some(pipe) = started.stdout {
            spawn_reader(pipe, sender.clone(), PipeLine::Stdout);
        }
        if let Some(pipe) = started.stderr {
            spawn_reader(pipe, sender.clone(), PipeLine::Stderr);
        }
        drop(sender);
        let mut output = OutputCollector::new(lines, stdout);

        let stdin_error = match (started.stdin, stdin) {
            (Some(mut pipe), Some(writer)) => {
                let written = writer(&mut pipe);
                drop(pipe);
                written.err().and_then(stdin_failure)
            }
            (pipe, _) => {
                drop(pipe);
                None
            }
        };

        let deadline = timeout.map(|t| Instant::now() + t);
        let outcome = match stdin_error {
            Some(e) => {
                self.gate.terminate();
                WaitOutcome::IoFailed(e)
            }
            None => self.wait_for_exit(deadline, &mut output),
        };

        let killed = !matches!(outcome, WaitOutcome::Exited(_)) || self.gate.is_stopping();
        let drain_deadline = if killed {
            Some(Instant::now() + READER_GRACE)
        } else {
            deadline.map(|deadline| deadline.max(Instant::now() + READER_GRACE))
        };
        if !output.finish(drain_deadline) {
            warn!(pid = started.pid, "git output is still open after git ended; returning what was read");
        }
        let OutputCollector {
            stdout: stdout_text,
            stderr: stderr_text,
            ..
        } = output;

        match outcome {
            WaitOutcome::Exited(code) => {
                debug!(pid = started.pid, exit_code = ?code, "git exited");
                let kind = if code.is_none() && self.gate.is_stopping() {
                    ResultKind::Stopped
                } else {
                    ResultKind::Completed
                };
                GitResult {
                    stdout: stdout_text,
                    stderr: stderr_text,
                    exit_code: code.unwrap_or(GitResult::GENERIC_FAILURE_CODE),
                    kind,
                }
            }
            WaitOutcome::TimedOut => {
                warn!(pid = started.pid, timeout = ?timeout, "git timed out and was killed");
                GitResult::failure(
                    ResultKind::TimedOut,
                    stdout_text,
                    format!("Operation timed out: {}", stderr_text),
                )
            }
            WaitOutcome::IoFailed(e) => GitResult::failure(
                ResultKind::IoFailed,
                stdout_text,
                format!("{}{}", stderr_text, e),
            ),
        }
    }

    /// Poll the gate until git exits or `deadline` passes, routing output
    /// between polls.
    fn wait_for_exit(&self, deadline: Option<Instant>, output: &mut OutputCollector<'_>) -> WaitOutcome {
        loop {
            match self.gate.poll_exit() {
                Ok(ExitPoll::Exited(code)) => return WaitOutcome::Exited(code),
                Ok(ExitPoll::Running) => {}
                Err(e) => {
                    self.gate.terminate();
                    return WaitOutcome::IoFailed(io::Error::new(
                        e.kind(),
                        format!("failed to wait for git: {}", e),
                    ));
                }
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                self.gate.terminate();
                return WaitOutcome::TimedOut;
            }

            output.collect_for(self.poll_interval);
        }
    }
}

/// Classify a stdin writer failure.
///
/// A broken pipe means git exited (or closed stdin) before reading all of
/// its input; the exit code tells the real story, so it is not an error
/// here. Anything else aborts the invocation.
fn stdin_failure(e: io::Error) -> Option<io::Error> {
    if e.kind() == io::ErrorKind::BrokenPipe {
        debug!("git closed stdin before all input was written");
        None
    } else {
        warn!(error = %e, "failed to write git stdin");
        Some(io::Error::new(
            e.kind(),
            format!("failed to write to git stdin: {}", e),
        ))
    }
}

/// Read `pipe` to EOF on a detached thread, sending each line.
///
/// Sends after the invocation gave up are dropped; the thread keeps reading
/// so whoever still holds the pipe never blocks on it.
fn spawn_reader<R>(pipe: R, sender: Sender<PipeLine>, wrap: fn(String) -> PipeLine)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for_each_line(pipe, |line| {
            let _ = sender.send(wrap(line.to_string()));
        })
    });
}

/// Call `f` with each line of `reader`, terminators stripped, until EOF.
fn for_each_line<R: Read>(reader: R, mut f: impl FnMut(&str)) {
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw) {
            Ok(0) => break,
            Ok(_) => {
                if raw.last() == Some(&b'\n') {
                    raw.pop();
                }
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
                f(&String::from_utf8_lossy(&raw));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests;
