//! Execution reporting

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use gantry_core::TargetInstanceId;

/// Effect tallies for one invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct EffectCounts {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Events emitted while invocations execute
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// An invocation handed control to its function
    Started {
        id: TargetInstanceId,
        function: String,
    },
    /// An effect is about to execute ("Verb target")
    EffectStarted {
        id: TargetInstanceId,
        verb: String,
        target: String,
    },
    /// An effect was not executed
    EffectSkipped {
        id: TargetInstanceId,
        verb: String,
        target: String,
        reason: String,
    },
    /// An effect failed
    EffectFailed {
        id: TargetInstanceId,
        verb: String,
        target: String,
        error: String,
    },
    /// A command produced output
    Output {
        id: TargetInstanceId,
        line: String,
        is_stderr: bool,
    },
    /// An invocation succeeded
    Completed {
        id: TargetInstanceId,
        duration: Duration,
        effects: EffectCounts,
    },
    /// An invocation was not needed
    Skipped {
        id: TargetInstanceId,
        reason: String,
    },
    /// An invocation failed
    Failed {
        id: TargetInstanceId,
        duration: Duration,
        error: String,
    },
    /// An invocation never ran or was interrupted
    Canceled {
        id: TargetInstanceId,
        reason: String,
    },
    /// The whole run is over
    AllCompleted {
        total: usize,
        succeeded: usize,
        skipped: usize,
        failed: usize,
        canceled: usize,
        duration: Duration,
    },
}

impl TaskEvent {
    /// The invocation the event belongs to, if any
    pub fn id(&self) -> Option<&TargetInstanceId> {
        match self {
            Self::Started { id, .. }
            | Self::EffectStarted { id, .. }
            | Self::EffectSkipped { id, .. }
            | Self::EffectFailed { id, .. }
            | Self::Output { id, .. }
            | Self::Completed { id, .. }
            | Self::Skipped { id, .. }
            | Self::Failed { id, .. }
            | Self::Canceled { id, .. } => Some(id),
            Self::AllCompleted { .. } => None,
        }
    }
}

/// Receives progress events
pub trait TaskReporter: Send + Sync {
    fn report(&self, event: &TaskEvent);
}

/// Simple reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Started { id, function } => {
                tracing::info!("Starting {} ({})", id, function);
            }
            TaskEvent::EffectStarted { id, verb, target } => {
                tracing::info!("[{}] {} {}", id, verb, target);
            }
            TaskEvent::EffectSkipped {
                id,
                verb,
                target,
                reason,
            } => {
                tracing::debug!("[{}] {} {} skipped: {}", id, verb, target, reason);
            }
            TaskEvent::EffectFailed {
                id,
                verb,
                target,
                error,
            } => {
                tracing::warn!("[{}] {} {} failed: {}", id, verb, target, error);
            }
            TaskEvent::Output { id, line, is_stderr } => {
                if *is_stderr {
                    tracing::warn!("[{}] {}", id, line);
                } else {
                    tracing::debug!("[{}] {}", id, line);
                }
            }
            TaskEvent::Completed {
                id,
                duration,
                effects,
            } => {
                tracing::info!(
                    "{} completed in {:.1}s ({} effects, {} skipped)",
                    id,
                    duration.as_secs_f64(),
                    effects.executed,
                    effects.skipped
                );
            }
            TaskEvent::Skipped { id, reason } => {
                tracing::info!("{} skipped: {}", id, reason);
            }
            TaskEvent::Failed { id, duration, error } => {
                tracing::error!("{} failed after {:.1}s: {}", id, duration.as_secs_f64(), error);
            }
            TaskEvent::Canceled { id, reason } => {
                tracing::warn!("{} canceled: {}", id, reason);
            }
            TaskEvent::AllCompleted {
                total,
                succeeded,
                skipped,
                failed,
                canceled,
                duration,
            } => {
                tracing::info!(
                    "All targets complete: {}/{} succeeded, {} up to date, {} failed, {} canceled ({:.1}s)",
                    succeeded,
                    total,
                    skipped,
                    failed,
                    canceled,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Collected events for one invocation
    pub fn events_for(&self, id: &TargetInstanceId) -> Vec<TaskEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.id() == Some(id))
            .collect()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
