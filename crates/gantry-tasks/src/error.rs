//! Error types for target execution

use gantry_core::{ConfigError, TargetInstanceId};

use crate::incremental::DependencyError;
use crate::process::ProcessError;

/// Errors a function's `run` or `clean` can produce
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A command could not start, timed out or exited unexpectedly
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The rebuild decision could not be made
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Configuration was accepted by the loader but is unusable here
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The invocation was asked to stop
    #[error("Canceled")]
    Canceled,

    /// Any other failure
    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Whether this error belongs to the configuration class
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Dependency(_))
    }
}

/// A failure captured at the invocation boundary
#[derive(Debug, thiserror::Error)]
#[error("Target '{id}' failed")]
pub struct TaskFailedError {
    pub id: TargetInstanceId,
    #[source]
    pub source: TaskError,
}

impl TaskFailedError {
    pub fn new(id: TargetInstanceId, source: TaskError) -> Self {
        Self { id, source }
    }

    /// Whether the target failed on its configuration rather than its work
    pub fn is_configuration(&self) -> bool {
        self.source.is_configuration()
    }
}

/// Errors while building the invocation graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The command line could not be understood
    #[error("Invalid selection: {0}")]
    Selection(String),
}
