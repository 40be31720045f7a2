//! Subprocess-executor seam.
//!
//! The external assistant is a black box: the orchestrator hands it a prompt
//! and gets back a line stream, an exit status and a cancellation hook.

use async_trait::async_trait;
use std::io;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Launch failures, distinct from non-zero exits.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("launch {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("subprocess i/o: {0}")]
    Io(#[from] io::Error),
}

/// Exit status of a finished subprocess.
#[derive(Debug, Clone, Copy)]
pub struct ExitInfo {
    /// Whether the process exited zero.
    pub success: bool,
    /// Raw exit code when available.
    pub code: Option<i32>,
}

/// Handle to a running subprocess: a line stream plus an exit status.
///
/// Lines arrive in emission order with stdout and stderr interleaved; stderr
/// lines are prefixed `[stderr] `. The stream ends (returns `None`) when both
/// pipes close, after which `wait` yields the exit status.
pub struct RunningProcess {
    lines: mpsc::Receiver<String>,
    status: oneshot::Receiver<io::Result<ExitInfo>>,
}

impl RunningProcess {
    pub fn new(
        lines: mpsc::Receiver<String>,
        status: oneshot::Receiver<io::Result<ExitInfo>>,
    ) -> Self {
        Self { lines, status }
    }

    /// Receives the next output line, or `None` at end of stream.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Waits for the process to finish and returns its exit status.
    pub async fn wait(self) -> io::Result<ExitInfo> {
        match self.status.await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "subprocess supervisor dropped without reporting status",
            )),
        }
    }
}

/// Spawns the external assistant.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Launches the subprocess with the prompt on stdin. Cancelling the token
    /// terminates the child; the line stream then ends at the next boundary.
    async fn spawn(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<RunningProcess, ExecError>;
}
