//! Invocation executor
//!
//! Every invocation gets its own tokio task. A task waits for its direct
//! predecessors' outcomes (shared futures), then for a concurrency permit,
//! then hands control to its function.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use gantry_core::{Mode, TargetInstanceId, Verbosity};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::{TaskError, TaskFailedError};
use crate::function::TaskContext;
use crate::graph::InvocationGraph;
use crate::process::{CommandExecutor, ProcessSupervisor, DEFAULT_TIMEOUT};
use crate::reporter::{EffectCounts, TaskEvent, TaskReporter};

/// Terminal state of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Succeeded,
    Skipped,
    Failed,
    Canceled,
}

impl InvocationStatus {
    /// Whether dependents may proceed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single invocation
#[derive(Debug, Clone, Serialize)]
pub struct InvocationOutcome {
    #[serde(serialize_with = "serialize_id")]
    pub id: TargetInstanceId,
    pub status: InvocationStatus,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
    pub effects: EffectCounts,
    /// Why the invocation was skipped or canceled, or the failure message
    pub reason: Option<String>,
    #[serde(skip)]
    pub error: Option<Arc<TaskFailedError>>,
}

impl InvocationOutcome {
    fn new(id: TargetInstanceId, status: InvocationStatus) -> Self {
        Self {
            id,
            status,
            duration: Duration::ZERO,
            effects: EffectCounts::default(),
            reason: None,
            error: None,
        }
    }

    fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

fn serialize_id<S: serde::Serializer>(value: &TargetInstanceId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_duration<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

/// Outcomes of a whole run, in topological order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: Mode,
    pub outcomes: Vec<InvocationOutcome>,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
    /// Whether the run was shut down early
    pub interrupted: bool,
}

impl RunSummary {
    fn count(&self, status: InvocationStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(InvocationStatus::Succeeded)
    }

    pub fn skipped(&self) -> usize {
        self.count(InvocationStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(InvocationStatus::Failed)
    }

    pub fn canceled(&self) -> usize {
        self.count(InvocationStatus::Canceled)
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_success())
    }

    pub fn outcome(&self, id: &TargetInstanceId) -> Option<&InvocationOutcome> {
        self.outcomes.iter().find(|o| &o.id == id)
    }

    /// Failed invocations with their errors
    pub fn failures(&self) -> impl Iterator<Item = &TaskFailedError> {
        self.outcomes.iter().filter_map(|o| o.error.as_deref())
    }

    /// Whether any invocation failed with a configuration-class error
    pub fn has_configuration_failure(&self) -> bool {
        self.failures().any(TaskFailedError::is_configuration)
    }
}

/// Options for the executor
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum concurrently running invocations
    pub concurrency: usize,
    pub mode: Mode,
    pub verbosity: Verbosity,
    /// Evaluate and report, but execute no effects
    pub dry_run: bool,
    /// Ignore build dependencies
    pub force: bool,
    /// Shut down on the first failure
    pub fail_fast: bool,
    /// Timeout for commands that do not declare one
    pub default_timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            mode: Mode::Run,
            verbosity: Verbosity::Normal,
            dry_run: false,
            force: false,
            fail_fast: false,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

type OutcomeFuture = Shared<BoxFuture<'static, InvocationOutcome>>;

struct RunState {
    graph: Arc<InvocationGraph>,
    options: ExecutorOptions,
    command_executor: Arc<dyn CommandExecutor>,
    reporter: Arc<dyn TaskReporter>,
    semaphore: Semaphore,
    shutdown: CancellationToken,
}

/// Executes an [`InvocationGraph`]
pub struct Executor {
    options: ExecutorOptions,
    command_executor: Arc<dyn CommandExecutor>,
    reporter: Arc<dyn TaskReporter>,
    shutdown: CancellationToken,
}

impl Executor {
    /// Create an executor running commands as local processes
    pub fn new(options: ExecutorOptions, reporter: Arc<dyn TaskReporter>) -> Self {
        Self {
            options,
            command_executor: Arc::new(ProcessSupervisor::new()),
            reporter,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_command_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.command_executor = executor;
        self
    }

    /// Token that shuts the run down when cancelled, e.g. on Ctrl-C
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Execute every invocation in the graph
    #[instrument(skip_all, fields(invocations = graph.len(), mode = ?self.options.mode))]
    pub async fn execute(&self, graph: Arc<InvocationGraph>) -> RunSummary {
        let start = Instant::now();
        let state = Arc::new(RunState {
            graph: graph.clone(),
            options: self.options.clone(),
            command_executor: self.command_executor.clone(),
            reporter: self.reporter.clone(),
            semaphore: Semaphore::new(self.options.concurrency.max(1)),
            shutdown: self.shutdown.clone(),
        });

        let mut futures: HashMap<TargetInstanceId, OutcomeFuture> = HashMap::new();
        let mut ordered = Vec::with_capacity(graph.len());

        for id in graph.sorted() {
            let predecessors: Vec<(TargetInstanceId, OutcomeFuture)> = graph
                .get(id)
                .map(|node| node.dependencies())
                .unwrap_or_default()
                .iter()
                .filter_map(|dep| futures.get(dep).map(|f| (dep.clone(), f.clone())))
                .collect();

            let handle = tokio::spawn(run_invocation(state.clone(), id.clone(), predecessors));
            let task_id = id.clone();
            let future = async move {
                match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let error = TaskFailedError::new(
                            task_id.clone(),
                            TaskError::failed(format!("invocation panicked: {}", e)),
                        );
                        let mut outcome = InvocationOutcome::new(task_id, InvocationStatus::Failed)
                            .with_reason(error.source.to_string());
                        outcome.error = Some(Arc::new(error));
                        outcome
                    }
                }
            }
            .boxed()
            .shared();

            futures.insert(id.clone(), future.clone());
            ordered.push(future);
        }

        let outcomes = join_all(ordered).await;
        let summary = RunSummary {
            mode: self.options.mode,
            outcomes,
            duration: start.elapsed(),
            interrupted: self.shutdown.is_cancelled(),
        };

        self.reporter.report(&TaskEvent::AllCompleted {
            total: summary.total(),
            succeeded: summary.succeeded(),
            skipped: summary.skipped(),
            failed: summary.failed(),
            canceled: summary.canceled(),
            duration: summary.duration,
        });
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            canceled = summary.canceled(),
            "run finished"
        );

        summary
    }
}

async fn run_invocation(
    state: Arc<RunState>,
    id: TargetInstanceId,
    predecessors: Vec<(TargetInstanceId, OutcomeFuture)>,
) -> InvocationOutcome {
    // Cleans are independent of each other
    if state.options.mode == Mode::Run {
        for (dep, future) in predecessors {
            let outcome = future.await;
            if !outcome.status.is_success() {
                return state.cancel(id, format!("dependency '{}' {}", dep, outcome.status));
            }
        }
    }

    let _permit = tokio::select! {
        permit = state.semaphore.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return state.cancel(id, "executor closed"),
        },
        _ = state.shutdown.cancelled() => return state.cancel(id, "run shut down"),
    };
    if state.shutdown.is_cancelled() {
        return state.cancel(id, "run shut down");
    }

    let Some(node) = state.graph.get(&id) else {
        return state.cancel(id, "not part of the graph");
    };
    let invocable = node.invocable();
    let start = Instant::now();

    if state.options.mode == Mode::Run && !state.options.force {
        match invocable.dependency() {
            Ok(Some(dependency)) if !dependency.requires_rebuild() => {
                let reason = "up to date";
                state.reporter.report(&TaskEvent::Skipped {
                    id: id.clone(),
                    reason: reason.to_string(),
                });
                return InvocationOutcome::new(id, InvocationStatus::Skipped).with_reason(reason);
            }
            Ok(_) => {}
            Err(error) => return state.fail(id, start, EffectCounts::default(), error),
        }
    }

    state.reporter.report(&TaskEvent::Started {
        id: id.clone(),
        function: node.function().to_string(),
    });

    let ctx = TaskContext::new(id.clone(), state.command_executor.clone(), state.reporter.clone())
        .with_mode(state.options.mode)
        .with_verbosity(state.options.verbosity)
        .with_dry_run(state.options.dry_run)
        .with_force(state.options.force)
        .with_command_defaults(node.command_defaults().clone())
        .with_default_timeout(state.options.default_timeout)
        .with_cancellation(state.shutdown.child_token());

    let work = match state.options.mode {
        Mode::Run => invocable.run(&ctx),
        Mode::Clean => invocable.clean(&ctx),
    };
    tokio::pin!(work);
    let result = tokio::select! {
        result = &mut work => result,
        _ = state.shutdown.cancelled() => {
            warn!(id = %id, "asking function to stop");
            invocable.cancel();
            work.await
        }
    };

    let effects = ctx.effect_counts();
    match result {
        Ok(()) => {
            let duration = start.elapsed();
            state.reporter.report(&TaskEvent::Completed {
                id: id.clone(),
                duration,
                effects,
            });
            InvocationOutcome {
                duration,
                effects,
                ..InvocationOutcome::new(id, InvocationStatus::Succeeded)
            }
        }
        Err(TaskError::Canceled) => {
            let mut outcome = state.cancel(id, "interrupted");
            outcome.duration = start.elapsed();
            outcome.effects = effects;
            outcome
        }
        Err(error) => state.fail(id, start, effects, error),
    }
}

impl RunState {
    fn cancel(&self, id: TargetInstanceId, reason: impl Into<String>) -> InvocationOutcome {
        let reason = reason.into();
        self.reporter.report(&TaskEvent::Canceled {
            id: id.clone(),
            reason: reason.clone(),
        });
        InvocationOutcome::new(id, InvocationStatus::Canceled).with_reason(reason)
    }

    fn fail(&self, id: TargetInstanceId, start: Instant, effects: EffectCounts, error: TaskError) -> InvocationOutcome {
        let duration = start.elapsed();
        let message = error.to_string();
        self.reporter.report(&TaskEvent::Failed {
            id: id.clone(),
            duration,
            error: message.clone(),
        });
        if self.options.fail_fast && !self.shutdown.is_cancelled() {
            warn!(id = %id, "failing fast");
            self.shutdown.cancel();
        }
        InvocationOutcome {
            duration,
            effects,
            reason: Some(message),
            error: Some(Arc::new(TaskFailedError::new(id.clone(), error))),
            ..InvocationOutcome::new(id, InvocationStatus::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{Function, FunctionRegistry};
    use crate::graph::Selection;
    use crate::incremental::{BuildDependency, SharedDependency};
    use crate::process::{
        CommandResult, CommandTimeoutError, ProcessError, RecordingExecutor, StartupFailure,
    };
    use crate::reporter::CollectingReporter;
    use async_trait::async_trait;
    use gantry_core::ProjectConfig;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct ProbeConfig {
        fail: bool,
        fail_clean: bool,
        fresh: bool,
        sleep_ms: u64,
        from: Option<String>,
    }

    #[derive(Default)]
    struct Probes {
        log: Mutex<Vec<String>>,
        active: AtomicUsize,
        peak: AtomicUsize,
        cancels: AtomicUsize,
    }

    impl Probes {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    struct Probe(Arc<Probes>);

    #[derive(Debug)]
    struct Fresh;

    impl BuildDependency for Fresh {
        fn requires_rebuild(&self) -> bool {
            false
        }
    }

    #[async_trait]
    impl Function for Probe {
        type Config = ProbeConfig;

        fn dependency(&self, config: &ProbeConfig) -> Result<Option<SharedDependency>, TaskError> {
            Ok(config.fresh.then(|| Arc::new(Fresh) as SharedDependency))
        }

        async fn run(&self, config: &ProbeConfig, ctx: &TaskContext) -> Result<(), TaskError> {
            let entry = match &config.from {
                Some(from) => format!("{}={}", ctx.id(), from),
                None => ctx.id().to_string(),
            };
            self.0.log.lock().unwrap().push(entry);

            let active = self.0.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.0.peak.fetch_max(active, Ordering::SeqCst);
            let result = tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(config.sleep_ms)) => Ok(()),
                _ = ctx.cancellation_token().cancelled() => Err(TaskError::Canceled),
            };
            self.0.active.fetch_sub(1, Ordering::SeqCst);
            result?;

            if config.fail {
                return Err(TaskError::failed(format!("{} broke", ctx.id())));
            }
            Ok(())
        }

        async fn clean(&self, config: &ProbeConfig, ctx: &TaskContext) -> Result<(), TaskError> {
            self.0.log.lock().unwrap().push(format!("clean {}", ctx.id()));
            if config.fail_clean {
                return Err(TaskError::failed("clean broke"));
            }
            Ok(())
        }

        fn cancel(&self) {
            self.0.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn registry(probes: &Arc<Probes>) -> FunctionRegistry {
        let mut registry = FunctionRegistry::with_builtins();
        let probes = probes.clone();
        registry.register("probe", move || Probe(probes.clone()));
        registry
    }

    fn graph(config: &str, probes: &Arc<Probes>, tokens: &[&str]) -> Arc<InvocationGraph> {
        let config: ProjectConfig = toml::from_str(config).unwrap();
        let selection = Selection::parse(tokens).unwrap();
        Arc::new(InvocationGraph::build(&config, &registry(probes), &selection).unwrap())
    }

    fn executor(options: ExecutorOptions) -> (Executor, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::default());
        let executor = Executor::new(options, reporter.clone())
            .with_command_executor(Arc::new(RecordingExecutor::new()));
        (executor, reporter)
    }

    fn id(s: &str) -> TargetInstanceId {
        TargetInstanceId::parse(s).unwrap()
    }

    const CHAIN: &str = r#"
        [targets.a]
        function = "probe"

        [targets.b]
        function = "probe"
        depends_on = ["a"]

        [targets.c]
        function = "probe"
    "#;

    #[tokio::test]
    async fn test_dependency_runs_first() {
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions::default());

        let summary = executor.execute(graph(CHAIN, &probes, &["b"])).await;

        assert!(summary.is_success());
        assert_eq!(probes.log(), vec!["a", "b"]);
        let order: Vec<_> = summary.outcomes.iter().map(|o| o.id.clone()).collect();
        assert_eq!(order, vec![id("a"), id("b")]);
    }

    #[tokio::test]
    async fn test_failure_cancels_dependents_only() {
        let probes = Arc::new(Probes::default());
        let (executor, reporter) = executor(ExecutorOptions::default());

        let summary = executor
            .execute(graph(CHAIN, &probes, &["a", "--fail", "b", "c"]))
            .await;

        assert!(!summary.is_success());
        assert_eq!(summary.outcome(&id("a")).unwrap().status, InvocationStatus::Failed);
        assert_eq!(summary.outcome(&id("b")).unwrap().status, InvocationStatus::Canceled);
        assert_eq!(summary.outcome(&id("c")).unwrap().status, InvocationStatus::Succeeded);
        assert!(!probes.log().contains(&"b".to_string()));

        let failures: Vec<_> = summary.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, id("a"));
        assert_eq!(failures[0].source.to_string(), "a broke");

        assert!(reporter.events().iter().any(|e| matches!(
            e,
            TaskEvent::Canceled { id: canceled, reason } if canceled.target == "b" && reason.contains("'a' failed")
        )));
    }

    #[tokio::test]
    async fn test_fail_fast_shuts_down() {
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions {
            fail_fast: true,
            ..Default::default()
        });

        let summary = executor
            .execute(graph(CHAIN, &probes, &["c", "--sleep_ms=30000", "a", "--fail", "--sleep_ms=20"]))
            .await;

        assert!(summary.interrupted);
        assert_eq!(summary.outcome(&id("a")).unwrap().status, InvocationStatus::Failed);
        assert_eq!(summary.outcome(&id("c")).unwrap().status, InvocationStatus::Canceled);
        assert!(summary.duration < Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_external_shutdown_cancels_running_functions() {
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions::default());
        let token = executor.shutdown_token();

        let graph = graph(CHAIN, &probes, &["b", "--sleep_ms=30000", "a", "--sleep_ms=30000"]);
        let run = executor.execute(graph);
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        };
        let (summary, ()) = tokio::join!(run, cancel);

        assert!(summary.interrupted);
        assert_eq!(summary.canceled(), 2);
        assert_eq!(probes.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(probes.log(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_up_to_date_invocation_is_skipped() {
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions::default());

        let summary = executor
            .execute(graph(CHAIN, &probes, &["a", "--fresh", "b"]))
            .await;

        assert!(summary.is_success());
        assert_eq!(summary.outcome(&id("a")).unwrap().status, InvocationStatus::Skipped);
        assert_eq!(summary.outcome(&id("b")).unwrap().status, InvocationStatus::Succeeded);
        assert_eq!(probes.log(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_force_runs_up_to_date_invocations() {
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions {
            force: true,
            ..Default::default()
        });

        let summary = executor.execute(graph(CHAIN, &probes, &["a", "--fresh"])).await;
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(probes.log(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_clean_mode_does_not_wait_for_predecessors() {
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions {
            mode: Mode::Clean,
            ..Default::default()
        });

        let summary = executor
            .execute(graph(CHAIN, &probes, &["a", "--fail_clean", "b"]))
            .await;

        assert_eq!(summary.mode, Mode::Clean);
        assert_eq!(summary.outcome(&id("a")).unwrap().status, InvocationStatus::Failed);
        assert_eq!(summary.outcome(&id("b")).unwrap().status, InvocationStatus::Succeeded);
        let mut log = probes.log();
        log.sort();
        assert_eq!(log, vec!["clean a", "clean b"]);
    }

    #[tokio::test]
    async fn test_concurrency_limit() {
        let config = r#"
            [config]
            sleep_ms = 50

            [targets.one]
            function = "probe"
            [targets.two]
            function = "probe"
            [targets.three]
            function = "probe"
        "#;

        let probes = Arc::new(Probes::default());
        let (serial, _) = executor(ExecutorOptions {
            concurrency: 1,
            ..Default::default()
        });
        serial.execute(graph(config, &probes, &["one", "two", "three"])).await;
        assert_eq!(probes.peak.load(Ordering::SeqCst), 1);

        let probes = Arc::new(Probes::default());
        let (parallel, _) = executor(ExecutorOptions::default());
        parallel.execute(graph(config, &probes, &["one", "two", "three"])).await;
        assert!(probes.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_isolated_configs_reach_functions() {
        let config = r#"
            [config]
            from = "X"

            [targets.copy]
            function = "probe"
            config = { from = "Y" }

            [targets.sibling]
            function = "probe"
            config = { from = "Y" }
        "#;
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions::default());

        executor
            .execute(graph(config, &probes, &["copy", "--from=Z", "sibling"]))
            .await;

        let mut log = probes.log();
        log.sort();
        assert_eq!(log, vec!["copy=Z", "sibling=Y"]);
    }

    #[tokio::test]
    async fn test_command_failure_cascades() {
        let config = r#"
            [targets.compile]
            function = "exec"
            config = { executable = "cc", args = ["-c", "main.c"] }

            [targets.link]
            function = "exec"
            depends_on = ["compile"]
            config = { executable = "ld" }
        "#;
        let probes = Arc::new(Probes::default());
        let commands = Arc::new(RecordingExecutor::new());
        commands.push_completed("cc", 1, "");
        let reporter = Arc::new(CollectingReporter::default());
        let executor = Executor::new(ExecutorOptions::default(), reporter.clone())
            .with_command_executor(commands.clone());

        let summary = executor.execute(graph(config, &probes, &["link"])).await;

        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.canceled(), 1);
        let specs = commands.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0], crate::process::CommandSpec::new("cc").args(["-c", "main.c"]));
        let failure = summary.failures().next().unwrap();
        assert!(failure.source.to_string().contains("exit-code 1"));
        assert!(matches!(
            reporter.events().last(),
            Some(TaskEvent::AllCompleted { failed: 1, canceled: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_sources_fail_as_configuration() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        let config = format!(
            r#"
            [targets.copy]
            function = "file/copy"
            config = {{ from = '{}', to = '{}' }}
            "#,
            temp.path().join("src").display(),
            temp.path().join("out").display()
        );
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions::default());

        let summary = executor.execute(graph(&config, &probes, &["copy"])).await;

        assert_eq!(summary.failed(), 1);
        assert!(summary.has_configuration_failure());
        let failure = summary.failures().next().unwrap();
        assert!(matches!(failure.source, TaskError::Dependency(_)));
    }

    #[tokio::test]
    async fn test_ordinary_failure_is_not_configuration() {
        let probes = Arc::new(Probes::default());
        let (executor, _) = executor(ExecutorOptions::default());
        let config = r#"
            [targets.a]
            function = "probe"
            config = { fail = true }
        "#;

        let summary = executor.execute(graph(config, &probes, &["a"])).await;

        assert_eq!(summary.failed(), 1);
        assert!(!summary.has_configuration_failure());
    }

    const PIPELINE: &str = r#"
        [targets.compile]
        function = "exec"
        config = { executable = "cc" }

        [targets.link]
        function = "exec"
        depends_on = ["compile"]
        config = { executable = "ld" }
    "#;

    async fn run_pipeline(first: CommandResult) -> RunSummary {
        let probes = Arc::new(Probes::default());
        let commands = Arc::new(RecordingExecutor::new());
        commands.push_response(first);
        let executor = Executor::new(ExecutorOptions::default(), Arc::new(CollectingReporter::default()))
            .with_command_executor(commands.clone());

        let summary = executor.execute(graph(PIPELINE, &probes, &["link"])).await;
        assert_eq!(commands.specs().len(), 1, "link must never run");
        summary
    }

    #[tokio::test]
    async fn test_startup_failure_cascades() {
        let summary = run_pipeline(CommandResult::StartupFailed(StartupFailure {
            executable: "cc".into(),
            error: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        }))
        .await;

        assert_eq!(summary.outcome(&id("compile")).unwrap().status, InvocationStatus::Failed);
        assert_eq!(summary.outcome(&id("link")).unwrap().status, InvocationStatus::Canceled);
        let failure = summary.failures().next().unwrap();
        assert!(matches!(
            failure.source,
            TaskError::Process(ProcessError::Startup { .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_cascades() {
        let elapsed = tokio::time::timeout(Duration::ZERO, std::future::pending::<()>())
            .await
            .unwrap_err();
        let summary = run_pipeline(CommandResult::TimedOut(CommandTimeoutError {
            executable: "cc".into(),
            timeout: Duration::from_secs(1),
            partial_output: "half".to_string(),
            partial_error: String::new(),
            source: elapsed,
        }))
        .await;

        assert_eq!(summary.outcome(&id("compile")).unwrap().status, InvocationStatus::Failed);
        assert_eq!(summary.outcome(&id("link")).unwrap().status, InvocationStatus::Canceled);
        let failure = summary.failures().next().unwrap();
        let TaskError::Process(ProcessError::Timeout(timeout)) = &failure.source else {
            panic!("expected a timeout, got {:?}", failure.source);
        };
        assert_eq!(timeout.partial_output, "half");
        assert!(failure.source.to_string().contains("INCOMPLETE"));
    }
}
