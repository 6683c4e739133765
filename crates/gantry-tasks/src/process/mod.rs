//! Process supervision
//!
//! A [`CommandSpec`] is executed by a [`CommandExecutor`] into exactly one
//! [`CommandResult`]. Policies decide which results become errors.

mod recording;
mod result;
mod spec;
mod supervisor;

pub use recording::RecordingExecutor;
pub use result::{CommandResult, CommandTimeoutError, CompletedCommand, ProcessError, StartupFailure};
pub use spec::{CommandSpec, Policy, DEFAULT_TIMEOUT};
pub use supervisor::{CommandExecutor, ProcessSupervisor};
