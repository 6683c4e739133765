//! Per-invocation context handed to functions

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gantry_core::{CommandDefaults, Mode, TargetInstanceId, Verbosity};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TaskError;
use crate::incremental::SharedDependency;
use crate::process::{CommandExecutor, CommandResult, CommandSpec, DEFAULT_TIMEOUT};
use crate::reporter::{EffectCounts, TaskEvent, TaskReporter};

/// What a function sees of the orchestrator while it runs.
///
/// Effects issued through the context are logged, counted and, where a
/// dependency says so, skipped.
pub struct TaskContext {
    id: TargetInstanceId,
    mode: Mode,
    verbosity: Verbosity,
    dry_run: bool,
    force: bool,
    command_defaults: CommandDefaults,
    default_timeout: Duration,
    executor: Arc<dyn CommandExecutor>,
    reporter: Arc<dyn TaskReporter>,
    cancel: CancellationToken,
    executed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl TaskContext {
    pub fn new(
        id: TargetInstanceId,
        executor: Arc<dyn CommandExecutor>,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        Self {
            id,
            mode: Mode::Run,
            verbosity: Verbosity::Normal,
            dry_run: false,
            force: false,
            command_defaults: CommandDefaults::default(),
            default_timeout: DEFAULT_TIMEOUT,
            executor,
            reporter,
            cancel: CancellationToken::new(),
            executed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_command_defaults(mut self, defaults: CommandDefaults) -> Self {
        self.command_defaults = defaults;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn id(&self) -> &TargetInstanceId {
        &self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn command_defaults(&self) -> &CommandDefaults {
        &self.command_defaults
    }

    /// Token cancelled when the orchestrator shuts down
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn effect_counts(&self) -> EffectCounts {
        EffectCounts {
            executed: self.executed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Start describing an effect, logged as "`verb` `target`"
    pub fn effect(&self, verb: impl Into<String>, target: impl Into<String>) -> EffectBuilder<'_> {
        EffectBuilder {
            ctx: self,
            verb: verb.into(),
            target: target.into(),
            dependency: None,
            tolerate_failure: false,
        }
    }

    /// A spec for `executable` seeded with this invocation's command defaults
    pub fn command_spec(&self, executable: impl Into<PathBuf>) -> CommandSpec {
        let defaults = &self.command_defaults;
        let mut spec = CommandSpec::new(executable)
            .with_timeout(defaults.timeout.unwrap_or(self.default_timeout));
        spec.environment
            .extend(defaults.environment.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(dir) = &defaults.work_dir {
            spec = spec.with_work_dir(dir);
        }
        if let Some(inherit) = defaults.inherit_parent_environment {
            spec = spec.with_inherit_parent_env(inherit);
        }
        spec
    }

    /// Run a command as an effect.
    ///
    /// `build` receives the seeded spec and adds arguments or changes the
    /// policy. Returns `None` when the effect was not executed (dry run).
    pub async fn effect_command<B>(
        &self,
        executable: impl Into<PathBuf>,
        build: B,
    ) -> Result<Option<CommandResult>, TaskError>
    where
        B: FnOnce(CommandSpec) -> CommandSpec,
    {
        let spec = build(self.command_spec(executable));
        self.effect("Run", spec.to_string()).command(spec).await
    }

    fn report(&self, event: TaskEvent) {
        self.reporter.report(&event);
    }

    fn report_output(&self, result: &CommandResult) {
        if self.verbosity < Verbosity::Verbose {
            return;
        }
        let (output, error) = match result {
            CommandResult::Completed(completed) => (completed.output.as_str(), completed.error.as_str()),
            CommandResult::TimedOut(timeout) => (timeout.partial_output.as_str(), timeout.partial_error.as_str()),
            CommandResult::StartupFailed(_) => return,
        };
        for (text, is_stderr) in [(output, false), (error, true)] {
            for line in text.lines() {
                self.report(TaskEvent::Output {
                    id: self.id.clone(),
                    line: line.to_string(),
                    is_stderr,
                });
            }
        }
    }
}

/// One pending effect; consumed by [`EffectBuilder::run`]
#[must_use = "an effect does nothing until it is run"]
pub struct EffectBuilder<'a> {
    ctx: &'a TaskContext,
    verb: String,
    target: String,
    dependency: Option<SharedDependency>,
    tolerate_failure: bool,
}

impl<'a> EffectBuilder<'a> {
    /// Skip the effect while `dependency` is up to date
    pub fn when(mut self, dependency: SharedDependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    /// Report a failure and carry on instead of failing the invocation
    pub fn tolerate_failure(mut self) -> Self {
        self.tolerate_failure = true;
        self
    }

    /// Execute `work` unless the effect is skipped.
    ///
    /// `Ok(None)` means the effect did not execute: it was up to date, this
    /// is a dry run, or it failed and failures are tolerated.
    pub async fn run<T, F, Fut>(self, work: F) -> Result<Option<T>, TaskError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let ctx = self.ctx;
        if ctx.is_canceled() {
            return Err(TaskError::Canceled);
        }

        if !ctx.force {
            if let Some(dependency) = &self.dependency {
                if !dependency.requires_rebuild() {
                    self.skip("up to date");
                    return Ok(None);
                }
            }
        }

        if ctx.dry_run {
            self.skip("dry run");
            return Ok(None);
        }

        if ctx.verbosity > Verbosity::Quiet {
            ctx.report(TaskEvent::EffectStarted {
                id: ctx.id.clone(),
                verb: self.verb.clone(),
                target: self.target.clone(),
            });
        }

        match work().await {
            Ok(value) => {
                ctx.executed.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Err(TaskError::Canceled) => Err(TaskError::Canceled),
            Err(error) => {
                ctx.failed.fetch_add(1, Ordering::Relaxed);
                ctx.report(TaskEvent::EffectFailed {
                    id: ctx.id.clone(),
                    verb: self.verb.clone(),
                    target: self.target.clone(),
                    error: error.to_string(),
                });
                if self.tolerate_failure {
                    Ok(None)
                } else {
                    Err(error)
                }
            }
        }
    }

    /// Execute `spec` through the command executor as this effect.
    ///
    /// Cancelling the context abandons the command, which kills the child.
    pub async fn command(self, spec: CommandSpec) -> Result<Option<CommandResult>, TaskError> {
        let ctx = self.ctx;
        self.run(|| async move {
            let result = tokio::select! {
                result = ctx.executor.run(&spec) => result?,
                _ = ctx.cancel.cancelled() => return Err(TaskError::Canceled),
            };
            ctx.report_output(&result);
            Ok::<_, TaskError>(result)
        })
        .await
    }

    fn skip(&self, reason: &str) {
        let ctx = self.ctx;
        ctx.skipped.fetch_add(1, Ordering::Relaxed);
        debug!(id = %ctx.id, verb = %self.verb, effect = %self.target, reason, "effect skipped");
        if ctx.verbosity > Verbosity::Quiet {
            ctx.report(TaskEvent::EffectSkipped {
                id: ctx.id.clone(),
                verb: self.verb.clone(),
                target: self.target.clone(),
                reason: reason.to_string(),
            });
        }
    }
}
