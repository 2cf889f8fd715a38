//! Shell Command Runner Implementation
//!
//! This module implements the `CommandRunner` port with `tokio::process`.
//! Commands run as `<shell> -c <command>` with stdout and stderr on two
//! separate pipes, each drained by its own reader task.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use zipship_domain::{
    deploy::{ExecutionResult, RunError},
    ports::CommandRunner,
    stream::{Channel, EventLog, EventSink, StreamEvent},
};

/// Shell used when none is configured
pub const DEFAULT_SHELL: &str = "sh";

/// Longest line forwarded as one event; longer output is split
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// `tokio::process`-based implementation of the CommandRunner port
///
/// The command text is passed to the shell untouched; this runner makes no
/// trust decision. No timeout is applied: a command runs until it exits.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl ShellCommandRunner {
    /// Create a runner that invokes `shell -c <command>`
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Get the shell program
    pub fn shell(&self) -> &str {
        &self.shell
    }

    fn command(&self, script: &str, work_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(script)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Spawn the command and forward both pipes to `sink` until exit
    async fn stream<S: EventSink>(mut cmd: Command, sink: S) -> Result<(), RunError> {
        let mut child = cmd.spawn().map_err(RunError::spawn)?;
        debug!(pid = ?child.id(), "Command started");

        let stdout = child.stdout.take().ok_or(RunError::Pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(RunError::Pipe("stderr"))?;

        let stdout_reader = tokio::spawn(forward_lines(stdout, Channel::Out, sink.clone()));
        let stderr_reader = tokio::spawn(forward_lines(stderr, Channel::Err, sink));

        // Both pipes are drained before the exit status is collected
        let (stdout_lines, stderr_lines) = tokio::join!(stdout_reader, stderr_reader);
        for (pipe, joined) in [("stdout", stdout_lines), ("stderr", stderr_lines)] {
            match joined {
                Ok(lines) => debug!(pipe, lines, "Pipe drained"),
                Err(err) => warn!(pipe, error = %err, "Pipe reader task failed"),
            }
        }

        let status = child.wait().await.map_err(RunError::wait)?;
        if status.success() {
            info!(%status, "Command finished");
            Ok(())
        } else {
            warn!(%status, "Command failed");
            Err(RunError::exit_status(status))
        }
    }
}

/// Forward every line of `pipe` to `sink`, returning the line count
///
/// Lines are split on `\n`; a trailing `\r` is dropped and invalid UTF-8
/// is replaced rather than treated as an error. A line longer than
/// `MAX_LINE_BYTES` is forwarded in pieces of at most that size.
async fn forward_lines<P, S>(pipe: P, channel: Channel, sink: S) -> usize
where
    P: AsyncRead + Unpin,
    S: EventSink,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut buf)
            .await;
        match read {
            Ok(0) => break,
            Ok(_) => {
                let line = buf
                    .strip_suffix(b"\n")
                    .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
                    .unwrap_or(&buf[..]);
                sink.emit(StreamEvent::new(
                    channel,
                    String::from_utf8_lossy(line).into_owned(),
                ))
                .await;
                count += 1;
            }
            Err(err) => {
                warn!(channel = channel.tag(), error = %err, "Pipe read failed");
                break;
            }
        }
    }

    count
}

impl CommandRunner for ShellCommandRunner {
    #[instrument(skip(self), fields(shell = %self.shell))]
    fn run(
        &self,
        command: &str,
        work_dir: &Path,
    ) -> impl std::future::Future<Output = ExecutionResult> + Send {
        let cmd = self.command(command, work_dir);

        async move {
            let log = EventLog::new();
            let status = Self::stream(cmd, log.clone()).await;

            ExecutionResult {
                exit_error: status.err(),
                combined_output_lines: log
                    .events()
                    .into_iter()
                    .map(|event| event.text().to_string())
                    .collect(),
            }
        }
    }

    #[instrument(skip(self, sink), fields(shell = %self.shell))]
    fn run_streaming<S: EventSink>(
        &self,
        command: &str,
        work_dir: &Path,
        sink: &S,
    ) -> impl std::future::Future<Output = Result<(), RunError>> + Send {
        let cmd = self.command(command, work_dir);
        let sink = sink.clone();
        let work_dir: PathBuf = work_dir.to_path_buf();

        async move {
            debug!(work_dir = %work_dir.display(), "Streaming command output");
            Self::stream(cmd, sink).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_on(log: &EventLog, channel: Channel) -> Vec<String> {
        log.events()
            .into_iter()
            .filter(|event| event.channel() == channel)
            .map(|event| event.text().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_streams_stdout_and_stderr_separately() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new();

        ShellCommandRunner::default()
            .run_streaming("echo hi; echo oops 1>&2; echo there", dir.path(), &log)
            .await
            .unwrap();

        assert_eq!(lines_on(&log, Channel::Out), vec!["hi", "there"]);
        assert_eq!(lines_on(&log, Channel::Err), vec!["oops"]);
    }

    #[tokio::test]
    async fn test_runs_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), b"").unwrap();
        let log = EventLog::new();

        ShellCommandRunner::default()
            .run_streaming("ls", dir.path(), &log)
            .await
            .unwrap();

        assert_eq!(lines_on(&log, Channel::Out), vec!["marker.txt"]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new();

        let err = ShellCommandRunner::default()
            .run_streaming("echo partial; exit 1", dir.path(), &log)
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::ExitStatus(_)));
        assert!(err.to_string().starts_with("script exited with error: "));
        assert_eq!(lines_on(&log, Channel::Out), vec!["partial"]);
    }

    #[tokio::test]
    async fn test_missing_shell_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShellCommandRunner::new("/nonexistent/zipship-shell")
            .run_streaming("true", dir.path(), &EventLog::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_missing_work_dir_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShellCommandRunner::default()
            .run_streaming("true", &dir.path().join("absent"), &EventLog::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_lines_keep_order_and_survive_odd_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new();

        ShellCommandRunner::default()
            .run_streaming(
                r"for i in 1 2 3 4 5; do echo $i; done; printf 'crlf\r\n'; printf '\377\n'; printf 'tail'",
                dir.path(),
                &log,
            )
            .await
            .unwrap();

        assert_eq!(
            lines_on(&log, Channel::Out),
            vec!["1", "2", "3", "4", "5", "crlf", "\u{FFFD}", "tail"]
        );
    }

    #[tokio::test]
    async fn test_blocking_run_collects_combined_output() {
        let dir = tempfile::tempdir().unwrap();

        let result = ShellCommandRunner::default()
            .run("echo built; echo careful 1>&2", dir.path())
            .await;

        assert!(result.is_success());
        let mut lines = result.combined_output_lines;
        lines.sort();
        assert_eq!(lines, vec!["built", "careful"]);
    }

    #[tokio::test]
    async fn test_blocking_run_keeps_output_on_failure() {
        let dir = tempfile::tempdir().unwrap();

        let result = ShellCommandRunner::default()
            .run("echo before; exit 3", dir.path())
            .await;

        assert!(matches!(result.exit_error, Some(RunError::ExitStatus(_))));
        assert_eq!(result.combined_output_lines, vec!["before"]);
    }

    #[tokio::test]
    async fn test_unterminated_output_is_split_into_bounded_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new();

        ShellCommandRunner::default()
            .run_streaming(
                "head -c 150000 /dev/zero | tr '\\0' 'a'; echo; echo next",
                dir.path(),
                &log,
            )
            .await
            .unwrap();

        let lengths: Vec<usize> = lines_on(&log, Channel::Out)
            .iter()
            .map(|line| line.len())
            .collect();
        assert_eq!(
            lengths,
            vec![MAX_LINE_BYTES, MAX_LINE_BYTES, 150_000 - 2 * MAX_LINE_BYTES, 4]
        );
        assert_eq!(lines_on(&log, Channel::Out).last().unwrap(), "next");
    }
}
