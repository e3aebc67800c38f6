//! Tests for process invocation, driven by fake git scripts.
#![cfg(unix)]

use super::*;
use crate::config::Config;
use crate::git::GitProcess;
use crate::test_support::FakeGit;
use serial_test::serial;
use std::sync::Mutex;

fn run(fake: &FakeGit, request: InvocationRequest<'_>) -> GitResult {
    fake.process_outside().invoke(request)
}

fn plain(command: &str) -> LaunchDescriptor {
    LaunchDescriptor::new(command, std::env::temp_dir()).fetch_missing_objects(true)
}

#[test]
fn test_buffers_stdout_and_stderr_with_exit_code() {
    let fake = FakeGit::new("echo out1\necho err1 >&2\nprintf 'no-newline'\nexit 3");
    let result = run(&fake, InvocationRequest::new(plain("anything")));

    assert_eq!(result.stdout, "out1\nno-newline\n");
    assert_eq!(result.stderr, "err1\n");
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.kind, ResultKind::Completed);
    assert!(result.exit_code_is_failure());
}

#[test]
fn test_crlf_output_is_normalized() {
    let fake = FakeGit::new("printf 'a\\r\\nb\\r\\n'");
    let result = run(&fake, InvocationRequest::new(plain("x")));
    assert_eq!(result.stdout, "a\nb\n");
}

#[test]
fn test_large_output_on_both_streams_does_not_hang() {
    // ~100KB on stdout, then ~80KB on stderr: both exceed a pipe buffer.
    let fake = FakeGit::new("yes line | head -n 20000\nyes err | head -n 20000 >&2\nexit 0");
    let request = InvocationRequest::new(plain("x")).with_timeout(Duration::from_secs(60));
    let result = run(&fake, request);

    assert_eq!(result.kind, ResultKind::Completed);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout.lines().count(), 20000);
    assert_eq!(result.stderr.lines().count(), 20000);
}

#[test]
fn test_line_callback_receives_lines_instead_of_buffer() {
    let fake = FakeGit::new("echo one\necho two\necho three");
    let lines = Mutex::new(Vec::new());

    let request = InvocationRequest::new(plain("x")).on_stdout_line(|line| {
        lines.lock().unwrap().push(line.to_string());
    });
    let result = run(&fake, request);

    assert!(result.exit_code_is_success());
    assert_eq!(result.stdout, "");
    assert_eq!(*lines.lock().unwrap(), vec!["one", "two", "three"]);
}

#[test]
fn test_no_capture_discards_stdout_but_keeps_stderr() {
    let fake = FakeGit::new("echo hidden\necho visible >&2");
    let request = InvocationRequest::new(plain("x")).with_stdout(StdoutMode::NoCapture);
    let result = run(&fake, request);

    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "visible\n");
}

#[test]
fn test_stdin_writer_output_reaches_git_and_stdin_is_closed() {
    let fake = FakeGit::new("cat");
    let request = InvocationRequest::new(plain("x"))
        .with_stdin(|stdin| stdin.write_all(b"url=https://example.com\n\n"))
        .with_timeout(Duration::from_secs(30));
    let result = run(&fake, request);

    assert_eq!(result.kind, ResultKind::Completed);
    assert_eq!(result.stdout, "url=https://example.com\n\n");
}

#[test]
fn test_stdin_closed_without_writer() {
    let fake = FakeGit::new("cat\necho done");
    let request = InvocationRequest::new(plain("x")).with_timeout(Duration::from_secs(30));
    let result = run(&fake, request);

    assert_eq!(result.kind, ResultKind::Completed);
    assert_eq!(result.stdout, "done\n");
}

#[test]
fn test_stdin_write_after_exit_is_swallowed() {
    let fake = FakeGit::new("exit 0");
    let payload = vec![b'x'; 1024 * 1024];
    let request = InvocationRequest::new(plain("x")).with_stdin(move |stdin| {
        // Give the script time to exit so the write hits a closed pipe.
        std::thread::sleep(Duration::from_millis(200));
        stdin.write_all(&payload)
    });
    let result = run(&fake, request);

    assert_eq!(result.kind, ResultKind::Completed);
    assert!(result.exit_code_is_success(), "stderr: {}", result.stderr);
}

#[test]
fn test_stdin_writer_error_fails_the_invocation() {
    let fake = FakeGit::new("cat");
    let request = InvocationRequest::new(plain("x"))
        .with_stdin(|_| Err(io::Error::other("writer gave up")))
        .with_timeout(Duration::from_secs(30));
    let result = run(&fake, request);

    assert_eq!(result.kind, ResultKind::IoFailed);
    assert!(result.exit_code_is_failure());
    assert!(result.stderr.contains("failed to write to git stdin: writer gave up"));
    assert!(matches!(result.to_error(), Some(crate::error::GitBridgeError::Io(_))));
}

#[test]
fn test_stdin_unavailable_fails_without_spawning() {
    let fake = FakeGit::new("exit 0");
    let config = Config {
        stdin_available: false,
        ..fake.config()
    };
    let process = GitProcess::new(&config, None).unwrap();

    let request = InvocationRequest::new(plain("x")).with_stdin(|stdin| stdin.write_all(b"x"));
    let result = process.invoke(request);

    assert_eq!(result.kind, ResultKind::LaunchFailed);
    assert_eq!(result.exit_code, GitResult::GENERIC_FAILURE_CODE);
    assert!(result.stderr.contains("stdin is not available"));
}

#[test]
fn test_timeout_kills_and_reports_partial_stderr() {
    let fake = FakeGit::new("echo partial >&2\nsleep 30");
    let started = Instant::now();
    let request = InvocationRequest::new(plain("x")).with_timeout(Duration::from_millis(300));
    let result = run(&fake, request);

    assert!(started.elapsed() < Duration::from_secs(15));
    assert_eq!(result.kind, ResultKind::TimedOut);
    assert_eq!(result.exit_code, GitResult::GENERIC_FAILURE_CODE);
    assert!(result.stderr.starts_with("Operation timed out: "));
    assert!(result.stderr.contains("partial"));
}

fn setsid_available() -> bool {
    std::process::Command::new("setsid")
        .arg("true")
        .status()
        .is_ok_and(|status| status.success())
}

#[test]
fn test_timeout_returns_while_escaped_descendant_holds_pipes() {
    if !setsid_available() {
        return;
    }
    // The setsid'd sleep leaves the process group, survives the kill, and
    // keeps stdout and stderr open.
    let fake = FakeGit::new("setsid sleep 10 &\necho partial >&2\nsleep 30");
    let started = Instant::now();
    let request = InvocationRequest::new(plain("x")).with_timeout(Duration::from_millis(300));
    let result = run(&fake, request);

    assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
    assert_eq!(result.kind, ResultKind::TimedOut);
    assert!(result.stderr.contains("partial"));
}

#[test]
fn test_exit_returns_at_deadline_while_escaped_descendant_holds_pipes() {
    if !setsid_available() {
        return;
    }
    let fake = FakeGit::new("setsid sleep 10 &\necho done");
    let started = Instant::now();
    let request = InvocationRequest::new(plain("x")).with_timeout(Duration::from_secs(1));
    let result = run(&fake, request);

    assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
    assert_eq!(result.kind, ResultKind::Completed);
    assert!(result.exit_code_is_success());
    assert_eq!(result.stdout, "done\n");
}

#[test]
fn test_lower_priority_starts_git_niced() {
    // `nice` without arguments prints the current niceness.
    let fake = FakeGit::new("nice");
    let normal = run(&fake, InvocationRequest::new(plain("x")));

    let config = Config {
        lower_priority: true,
        ..fake.config()
    };
    let process = GitProcess::new(&config, None).unwrap();
    let lowered = process.invoke(InvocationRequest::new(plain("x")));

    let normal: i32 = normal.stdout.trim().parse().unwrap();
    let lowered: i32 = lowered.stdout.trim().parse().unwrap();
    assert_eq!(lowered, (normal + 10).min(19));
}

#[test]
fn test_lower_priority_keeps_arguments() {
    let fake = FakeGit::new("printf '%s\\n' \"$@\"");
    let launch = LaunchDescriptor::new("remote -v", std::env::temp_dir())
        .fetch_missing_objects(true)
        .lower_priority(true);
    let result = run(&fake, InvocationRequest::new(launch));

    assert!(result.exit_code_is_success(), "stderr: {}", result.stderr);
    assert_eq!(result.stdout, "remote\n-v\n");
}

#[test]
fn test_default_timeout_comes_from_config() {
    let fake = FakeGit::new("sleep 30");
    let config = Config {
        timeout_secs: Some(1),
        ..fake.config()
    };
    let process = GitProcess::new(&config, None).unwrap();
    let result = process.invoke(InvocationRequest::new(plain("x")));
    assert_eq!(result.kind, ResultKind::TimedOut);
}

#[test]
fn test_launch_failure_is_a_result_not_a_panic() {
    let config = Config::with_git_bin_path("/definitely/not/a/git-binary");
    let process = GitProcess::new(&config, None).unwrap();
    let result = process.invoke(InvocationRequest::new(plain("--version")));

    assert_eq!(result.kind, ResultKind::LaunchFailed);
    assert_eq!(result.exit_code, GitResult::GENERIC_FAILURE_CODE);
    assert!(!result.stderr.is_empty());
}

#[test]
#[serial]
fn test_mark_stopping_prevents_spawn() {
    let fake = FakeGit::new("touch \"$MARKER\"");
    let marker = fake.scratch("spawned");
    // SAFETY: serialized with other env-mutating tests.
    unsafe { std::env::set_var("MARKER", &marker) };

    let process = fake.process_outside();
    process.mark_stopping();
    let result = process.invoke(InvocationRequest::new(plain("x")));

    unsafe { std::env::remove_var("MARKER") };
    assert_eq!(result.kind, ResultKind::Stopped);
    assert_eq!(result.stderr, "GitProcess is stopping");
    assert!(!marker.exists());
}

#[test]
fn test_kill_from_another_thread_stops_invocation() {
    let fake = FakeGit::new("sleep 30");
    let process = fake.process_outside();

    let result = std::thread::scope(|scope| {
        let running = scope.spawn(|| process.invoke(InvocationRequest::new(plain("x"))));

        let deadline = Instant::now() + Duration::from_secs(10);
        while !process.is_running() {
            assert!(Instant::now() < deadline, "process never started");
            std::thread::sleep(Duration::from_millis(5));
        }

        let report = process.kill_running_process();
        assert!(report.success, "kill failed: {:?}", report.error);
        assert_eq!(report.process_name.as_deref(), Some("fake-git"));

        running.join().unwrap()
    });

    assert_eq!(result.kind, ResultKind::Stopped);
    assert!(result.exit_code_is_failure());

    // The instance stays stopped.
    let again = process.invoke(InvocationRequest::new(plain("x")));
    assert_eq!(again.kind, ResultKind::Stopped);
}

#[test]
fn test_invocations_on_one_instance_serialize() {
    let fake = FakeGit::new("echo start >> \"$0.log\"\nsleep 0.2\necho end >> \"$0.log\"");
    let process = fake.process_outside();

    std::thread::scope(|scope| {
        let a = scope.spawn(|| process.invoke(InvocationRequest::new(plain("x"))));
        let b = scope.spawn(|| process.invoke(InvocationRequest::new(plain("x"))));
        assert!(a.join().unwrap().exit_code_is_success());
        assert!(b.join().unwrap().exit_code_is_success());
    });

    let log = std::fs::read_to_string(format!("{}.log", fake.path.display())).unwrap();
    assert_eq!(log, "start\nend\nstart\nend\n");
}

#[test]
fn test_arguments_are_passed_verbatim() {
    let fake = FakeGit::new("printf '%s\\n' \"$@\"");
    let launch = LaunchDescriptor::new("config --local 'a b' c", std::env::temp_dir());
    let result = run(&fake, InvocationRequest::new(launch));

    assert_eq!(
        result.stdout,
        "-c\ncore.useGvfsHelper=false\nconfig\n--local\na b\nc\n"
    );
}

#[test]
#[serial]
fn test_environment_is_sanitized() {
    let fake = FakeGit::new("env");
    // SAFETY: serialized with other env-mutating tests.
    unsafe {
        std::env::set_var("GIT_TRACE", "1");
        std::env::set_var("GIT_TRACE_SETUP", "/tmp/trace-setup.log");
    }

    let launch = plain("x")
        .interactive(false)
        .object_directory(Some(std::path::PathBuf::from("/tmp/objects")));
    let result = run(&fake, InvocationRequest::new(launch));

    unsafe {
        std::env::remove_var("GIT_TRACE");
        std::env::remove_var("GIT_TRACE_SETUP");
    }

    let vars: Vec<&str> = result.stdout.lines().collect();
    assert!(vars.contains(&"GIT_TERMINAL_PROMPT=0"));
    assert!(vars.contains(&"GCM_VALIDATE=0"));
    assert!(vars.contains(&"GCM_INTERACTIVE=Never"));
    assert!(vars.contains(&"GIT_OBJECT_DIRECTORY=/tmp/objects"));
    assert!(vars.contains(&"GIT_TRACE_SETUP=/tmp/trace-setup.log"));
    assert!(!vars.iter().any(|v| v.starts_with("GIT_TRACE=")));
}

#[test]
fn test_for_each_line_handles_invalid_utf8() {
    let mut lines = Vec::new();
    for_each_line(&b"ok\n\xff\xfe\nlast"[..], |line| lines.push(line.to_string()));
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "ok");
    assert_eq!(lines[2], "last");
}
