//! `exec`: run one external command

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gantry_core::ConfigError;
use serde::Deserialize;
use tracing::warn;

use crate::error::TaskError;
use crate::function::{Function, TaskContext};
use crate::incremental::{FileDependency, GlobSources, SharedDependency, Targets};
use crate::process::{CommandResult, Policy};

fn default_pattern() -> String {
    "**/*".to_string()
}

/// Files an `exec` target reads
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    pub root: PathBuf,
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecConfig {
    pub executable: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// File receiving captured stdout
    pub output: Option<PathBuf>,
    /// With `output`, makes the target incremental
    pub sources: Option<SourceSpec>,
    /// Extra attempts after a failure
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Debug, Default)]
pub struct ExecFunction {
    canceled: AtomicBool,
}

impl ExecFunction {
    pub const NAME: &'static str = "exec";
}

#[async_trait]
impl Function for ExecFunction {
    type Config = ExecConfig;

    fn validate(&self, config: &ExecConfig) -> Result<(), ConfigError> {
        if config.executable.as_os_str().is_empty() {
            return Err(ConfigError::invalid("executable", "must not be empty"));
        }
        if config.sources.is_some() && config.output.is_none() {
            return Err(ConfigError::invalid("sources", "requires an output file"));
        }
        Ok(())
    }

    fn dependency(&self, config: &ExecConfig) -> Result<Option<SharedDependency>, TaskError> {
        let (Some(sources), Some(output)) = (&config.sources, &config.output) else {
            return Ok(None);
        };
        let sources = GlobSources::new(&sources.root, &sources.pattern)?;
        Ok(Some(Arc::new(FileDependency::new(
            Arc::new(sources),
            Targets::new([output]),
        ))))
    }

    async fn run(&self, config: &ExecConfig, ctx: &TaskContext) -> Result<(), TaskError> {
        let mut attempt = 0;
        loop {
            if self.canceled.load(Ordering::SeqCst) {
                return Err(TaskError::Canceled);
            }

            let spec = ctx
                .command_spec(&config.executable)
                .args(config.args.iter().cloned())
                .with_policy(config.policy);
            let mut effect = ctx.effect("Run", spec.to_string());
            if attempt < config.retries {
                effect = effect.tolerate_failure();
            }

            match effect.command(spec).await? {
                Some(result) => return persist(config.output.as_deref(), result, ctx).await,
                None if ctx.is_dry_run() => return Ok(()),
                None => {
                    attempt += 1;
                    warn!(id = %ctx.id(), attempt, retries = config.retries, "retrying command");
                }
            }
        }
    }

    async fn clean(&self, config: &ExecConfig, ctx: &TaskContext) -> Result<(), TaskError> {
        let Some(output) = &config.output else {
            return Ok(());
        };
        if !output.exists() {
            return Ok(());
        }
        ctx.effect("Remove", output.display().to_string())
            .run(|| async move {
                tokio::fs::remove_file(output).await?;
                Ok::<_, TaskError>(())
            })
            .await?;
        Ok(())
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }
}

async fn persist(output: Option<&Path>, result: CommandResult, ctx: &TaskContext) -> Result<(), TaskError> {
    let contents = match result {
        CommandResult::Completed(completed) => completed.output,
        CommandResult::TimedOut(timeout) => timeout.labeled_output(),
        CommandResult::StartupFailed(failure) => {
            warn!(id = %ctx.id(), error = %failure.error, "command did not start");
            return Ok(());
        }
    };
    let Some(output) = output else {
        return Ok(());
    };

    ctx.effect("Write", output.display().to_string())
        .run(|| async move {
            if let Some(parent) = output.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(output, contents).await?;
            Ok::<_, TaskError>(())
        })
        .await?;
    Ok(())
}
