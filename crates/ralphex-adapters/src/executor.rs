//! Subprocess executor with real-time line streaming.
//!
//! Runs the assistant CLI with the prompt on stdin, interleaves stdout and
//! stderr lines into one ordered stream, and terminates the child with
//! SIGTERM when the run is canceled.

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use ralphex_core::executor::{ExecError, Executor, ExitInfo, RunningProcess};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executor that runs a configured command for each iteration.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    command: String,
    args: Vec<String>,
}

impl CommandExecutor {
    /// Creates an executor for the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Adds fixed arguments passed on every launch.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Sends SIGTERM to the child process.
    fn terminate(child: &Child) {
        if let Some(pid) = child.id() {
            #[allow(clippy::cast_possible_wrap)]
            let pid = Pid::from_raw(pid as i32);
            debug!(%pid, "sending SIGTERM to child process");
            let _ = kill(pid, Signal::SIGTERM);
        }
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn spawn(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<RunningProcess, ExecError> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        // prompt goes over stdin; closing it signals EOF
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            drop(stdin);
        }

        let (line_tx, line_rx) = mpsc::channel::<String>(256);
        let (status_tx, status_rx) = oneshot::channel();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_tx = line_tx.clone();
        let stdout_task = tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if stdout_tx.send(line).await.is_err() {
                        break;
                    }
                }
            }
        });

        let stderr_tx = line_tx;
        let stderr_task = tokio::spawn(async move {
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if stderr_tx.send(format!("[stderr] {line}")).await.is_err() {
                        break;
                    }
                }
            }
        });

        // supervisor: waits for exit, SIGTERMs on cancellation, reports status
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = cancel.cancelled() => {
                    warn!("cancellation requested, terminating subprocess");
                    Self::terminate(&child);
                    child.wait().await
                }
            };

            // drain readers so the line stream ends before status is observable
            let _ = stdout_task.await;
            let _ = stderr_task.await;

            let _ = status_tx.send(status.map(|s| ExitInfo {
                success: s.success(),
                code: s.code(),
            }));
        });

        Ok(RunningProcess::new(line_rx, status_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn collect(mut process: RunningProcess) -> (Vec<String>, ExitInfo) {
        let mut lines = Vec::new();
        while let Some(line) = process.next_line().await {
            lines.push(line);
        }
        let status = process.wait().await.unwrap();
        (lines, status)
    }

    #[tokio::test]
    async fn test_streams_stdout() {
        let executor = CommandExecutor::new("cat");
        let process = executor
            .spawn("hello world\nsecond line", CancellationToken::new())
            .await
            .unwrap();
        let (lines, status) = collect(process).await;

        assert_eq!(lines, vec!["hello world", "second line"]);
        assert!(status.success);
        assert_eq!(status.code, Some(0));
    }

    #[tokio::test]
    async fn test_stderr_lines_are_prefixed() {
        let executor =
            CommandExecutor::new("sh").with_args(["-c".to_string(), "echo err >&2".to_string()]);
        let process = executor.spawn("", CancellationToken::new()).await.unwrap();
        let (lines, _) = collect(process).await;

        assert_eq!(lines, vec!["[stderr] err"]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_reported() {
        let executor = CommandExecutor::new("false");
        let process = executor.spawn("", CancellationToken::new()).await.unwrap();
        let (_, status) = collect(process).await;

        assert!(!status.success);
        assert_eq!(status.code, Some(1));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let executor = CommandExecutor::new("definitely-not-a-real-binary");
        let err = executor
            .spawn("", CancellationToken::new())
            .await
            .err()
            .expect("spawn should fail");
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_terminates_child() {
        let executor = CommandExecutor::new("sleep").with_args(["30".to_string()]);
        let cancel = CancellationToken::new();
        let process = executor.spawn("", cancel.clone()).await.unwrap();

        cancel.cancel();

        // the stream must end promptly rather than waiting out the sleep
        let (lines, status) =
            tokio::time::timeout(Duration::from_secs(5), collect(process))
                .await
                .expect("canceled subprocess should wind down quickly");
        assert!(lines.is_empty());
        assert!(!status.success);
    }
}
