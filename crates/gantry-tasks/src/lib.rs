//! gantry Tasks - target orchestration engine
//!
//! This crate resolves requested targets into an invocation graph, decides
//! from file timestamps which invocations are out of date, and executes the
//! rest concurrently with supervised external processes.

pub mod error;
pub mod executor;
pub mod function;
pub mod functions;
pub mod graph;
pub mod incremental;
pub mod process;
pub mod reporter;

pub use error::{GraphError, TaskError, TaskFailedError};
pub use executor::{Executor, ExecutorOptions, InvocationOutcome, InvocationStatus, RunSummary};
pub use function::{EffectBuilder, Function, FunctionRegistry, Invocable, TaskContext};
pub use graph::{InvocationGraph, RequestedTarget, Selection, TargetInvocation};
pub use reporter::{CollectingReporter, EffectCounts, TaskEvent, TaskReporter, TracingReporter};
