//! Subprocess plumbing for toolchain and dependency probes.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Default timeout for external probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Output {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Run a command, capturing stdout and stderr.
///
/// Probes hang on broken toolchain wrappers often enough that every external
/// execution is bounded: the child is waited on from a helper thread and
/// `None` is returned when the timeout elapses. A command that cannot be
/// spawned at all (missing binary) also returns `None`.
pub fn run(program: &Path, args: &[&str], timeout: Duration) -> Option<Output> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let _ = sender.send(child.wait_with_output());
    });

    match receiver.recv_timeout(timeout) {
        Ok(Ok(output)) => Some(Output {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn captures_stdout() {
        let out = run(&PathBuf::from("echo"), &["hello"], PROBE_TIMEOUT).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn missing_binary_is_none() {
        assert!(run(&PathBuf::from("/no/such/binary"), &[], PROBE_TIMEOUT).is_none());
    }
}
