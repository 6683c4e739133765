//! Process supervisor: runs external commands under a timeout

use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::result::{CommandResult, CommandTimeoutError, CompletedCommand, ProcessError, StartupFailure};
use super::spec::CommandSpec;

/// Executes command specs.
///
/// `execute` never fails for ordinary process failures; `run` applies the
/// spec's policy on top.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, spec: &CommandSpec) -> CommandResult;

    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ProcessError> {
        self.execute(spec).await.apply(spec.policy)
    }
}

/// Runs commands as local child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self
    }
}

type Buffer = Arc<Mutex<Vec<u8>>>;

/// How long pipes may stay open once the process has exited
const DRAIN_GRACE: Duration = Duration::from_millis(250);

#[async_trait]
impl CommandExecutor for ProcessSupervisor {
    #[instrument(skip_all, fields(command = %spec, timeout = ?spec.timeout))]
    async fn execute(&self, spec: &CommandSpec) -> CommandResult {
        let mut cmd = Command::new(&spec.executable);
        cmd.args(&spec.args).stdin(Stdio::null()).kill_on_drop(true);

        if !spec.inherit_parent_env {
            cmd.env_clear();
        }
        cmd.envs(&spec.environment);

        if let Some(dir) = &spec.work_dir {
            cmd.current_dir(dir);
        }

        if spec.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(error) => {
                debug!(error = %error, "command failed to start");
                return CommandResult::StartupFailed(StartupFailure {
                    executable: spec.executable.clone(),
                    error,
                });
            }
        };

        let stdout: Buffer = Arc::default();
        let stderr: Buffer = Arc::default();
        let mut readers = Vec::new();
        if let Some(pipe) = child.stdout.take() {
            readers.push(capture(pipe, stdout.clone()));
        }
        if let Some(pipe) = child.stderr.take() {
            readers.push(capture(pipe, stderr.clone()));
        }

        let deadline = tokio::time::Instant::now() + spec.timeout;
        match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => {
                drain(readers).await;
                let exit_code = status.code().unwrap_or(-1);
                debug!(exit_code, "command completed");
                CommandResult::Completed(CompletedCommand {
                    executable: spec.executable.clone(),
                    exit_code,
                    output: snapshot(&stdout),
                    error: snapshot(&stderr),
                })
            }
            Ok(Err(error)) => {
                warn!(error = %error, "failed to wait for command");
                CommandResult::StartupFailed(StartupFailure {
                    executable: spec.executable.clone(),
                    error,
                })
            }
            Err(elapsed) => {
                warn!("command timed out, terminating");
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "kill after timeout failed");
                }
                let _ = child.wait().await;
                for reader in &readers {
                    reader.abort();
                }
                CommandResult::TimedOut(CommandTimeoutError {
                    executable: spec.executable.clone(),
                    timeout: spec.timeout,
                    partial_output: snapshot(&stdout),
                    partial_error: snapshot(&stderr),
                    source: elapsed,
                })
            }
        }
    }
}

/// Wait briefly for the pipes to reach EOF after the process exited.
///
/// Descendants that inherited a pipe can keep it open indefinitely; their
/// readers are abandoned once the grace period is over.
async fn drain(readers: Vec<JoinHandle<()>>) {
    let grace = tokio::time::Instant::now() + DRAIN_GRACE;
    for mut reader in readers {
        if tokio::time::timeout_at(grace, &mut reader).await.is_err() {
            debug!("output pipe still open after exit, detaching");
            reader.abort();
        }
    }
}

/// Accumulate a pipe into a shared buffer as data arrives
fn capture<R>(mut pipe: R, buffer: Buffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
            }
        }
    })
}

fn snapshot(buffer: &Buffer) -> String {
    let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}
