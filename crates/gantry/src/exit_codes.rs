//! Exit codes for the CLI

use gantry_core::{ConfigError, GantryError};
use gantry_tasks::{GraphError, RunSummary};

/// Success
pub const SUCCESS: i32 = 0;

/// A target failed or was canceled
pub const ERROR: i32 = 1;

/// Configuration error, nothing was executed
pub const CONFIG_ERROR: i32 = 2;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Exit code for an error that ended the command
pub fn for_error(error: &anyhow::Error) -> i32 {
    let configuration = error.chain().any(|cause| {
        cause.is::<ConfigError>() || cause.is::<GantryError>() || cause.is::<GraphError>()
    });
    if configuration {
        CONFIG_ERROR
    } else {
        ERROR
    }
}

/// Exit code for a finished run
pub fn for_summary(summary: &RunSummary, interrupted: bool) -> i32 {
    if interrupted {
        CANCELLED
    } else if summary.has_configuration_failure() {
        CONFIG_ERROR
    } else if summary.is_success() {
        SUCCESS
    } else {
        ERROR
    }
}
