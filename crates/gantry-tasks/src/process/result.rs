//! Command outcomes and the errors policies turn them into

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::error::Elapsed;

use super::spec::Policy;

/// The outcome of running one [`CommandSpec`](super::CommandSpec).
///
/// Consumers match on all three variants.
#[derive(Debug)]
pub enum CommandResult {
    /// The process could not be started
    StartupFailed(StartupFailure),
    /// The process exited on its own
    Completed(CompletedCommand),
    /// The timeout elapsed and the process was terminated
    TimedOut(CommandTimeoutError),
}

#[derive(Debug)]
pub struct StartupFailure {
    pub executable: PathBuf,
    pub error: std::io::Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCommand {
    pub executable: PathBuf,
    pub exit_code: i32,
    /// Captured stdout
    pub output: String,
    /// Captured stderr
    pub error: String,
}

impl CompletedCommand {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn check_exit_code(&self, expected: i32) -> Result<&Self, ProcessError> {
        if self.exit_code == expected {
            Ok(self)
        } else {
            Err(ProcessError::UnexpectedExitCode {
                executable: self.executable.display().to_string(),
                expected,
                actual: self.exit_code,
                stderr: self.error.clone(),
            })
        }
    }

    pub fn require_zero_status(&self) -> Result<&Self, ProcessError> {
        self.check_exit_code(0)
    }
}

/// A command ran past its timeout
#[derive(Debug, thiserror::Error)]
#[error("'{}' timed out after {:?}; captured output is INCOMPLETE", .executable.display(), .timeout)]
pub struct CommandTimeoutError {
    pub executable: PathBuf,
    pub timeout: Duration,
    /// Stdout captured before termination
    pub partial_output: String,
    /// Stderr captured before termination
    pub partial_error: String,
    #[source]
    pub source: Elapsed,
}

impl CommandTimeoutError {
    /// The partial stdout, labeled as incomplete
    pub fn labeled_output(&self) -> String {
        format!("[INCOMPLETE]\n{}", self.partial_output)
    }
}

/// Errors raised by policies on a [`CommandResult`]
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to start '{executable}': {source}")]
    Startup {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Timeout(#[from] CommandTimeoutError),

    #[error("'{executable}' exited with exit-code {actual} (expected {expected})")]
    UnexpectedExitCode {
        executable: String,
        expected: i32,
        actual: i32,
        stderr: String,
    },
}

impl CommandResult {
    /// The completed outcome, or the error explaining why there is none
    pub fn into_completed(self) -> Result<CompletedCommand, ProcessError> {
        match self {
            Self::Completed(completed) => Ok(completed),
            Self::StartupFailed(failure) => Err(ProcessError::Startup {
                executable: failure.executable.display().to_string(),
                source: failure.error,
            }),
            Self::TimedOut(timeout) => Err(ProcessError::Timeout(timeout)),
        }
    }

    /// Apply a policy, returning the outcome or the error it demands
    pub fn apply(self, policy: Policy) -> Result<Self, ProcessError> {
        match policy {
            Policy::NoPolicy => Ok(self),
            Policy::RequireCompleted => self.into_completed().map(Self::Completed),
            Policy::RequireZeroStatus => {
                let completed = self.into_completed()?;
                completed.require_zero_status()?;
                Ok(Self::Completed(completed))
            }
        }
    }
}
