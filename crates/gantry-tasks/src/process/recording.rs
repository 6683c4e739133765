//! Command executor that records specs instead of spawning processes

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::result::{CommandResult, CompletedCommand};
use super::spec::CommandSpec;
use super::supervisor::CommandExecutor;

/// Records every spec it is asked to execute and replays queued results
/// (useful for testing). Without a queued result a command completes with
/// exit code 0 and no output.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    specs: Mutex<Vec<CommandSpec>>,
    responses: Mutex<VecDeque<CommandResult>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next executed command
    pub fn push_response(&self, result: CommandResult) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    /// Queue a completed result with the given exit code and stdout
    pub fn push_completed(&self, executable: impl Into<PathBuf>, exit_code: i32, output: impl Into<String>) {
        self.push_response(CommandResult::Completed(CompletedCommand {
            executable: executable.into(),
            exit_code,
            output: output.into(),
            error: String::new(),
        }));
    }

    /// All specs executed so far, in order
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, spec: &CommandSpec) -> CommandResult {
        self.specs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(spec.clone());

        let queued = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        queued.unwrap_or_else(|| {
            CommandResult::Completed(CompletedCommand {
                executable: spec.executable.clone(),
                exit_code: 0,
                output: String::new(),
                error: String::new(),
            })
        })
    }
}
