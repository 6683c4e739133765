//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gantry_core::{Mode, ProjectConfig, Verbosity};

/// gantry - run declared targets, rebuilding only what is out of date
#[derive(Debug, Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Options go before the targets; `--key=value` after a target overrides its configuration.")]
pub struct Cli {
    /// Output verbosity: quiet, normal or verbose
    #[arg(long, value_name = "LEVEL")]
    pub verbosity: Option<Verbosity>,

    /// Shorthand for --verbosity verbose
    #[arg(short, long, conflicts_with_all = ["quiet", "verbosity"])]
    pub verbose: bool,

    /// Shorthand for --verbosity quiet
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Clean the targets instead of running them
    #[arg(long)]
    pub clean: bool,

    /// Decide and report what would run without executing effects
    #[arg(long)]
    pub dry_run: bool,

    /// Run targets even when they are up to date
    #[arg(long)]
    pub force: bool,

    /// Stop all targets after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Maximum concurrently running targets
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Show the execution plan without running
    #[arg(long)]
    pub plan: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long)]
    pub directory: Option<PathBuf>,

    /// Configuration file (default: search upward for gantry.toml)
    #[arg(short, long, env = "GANTRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override applied to every requested target
    #[arg(short = 'D', long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Targets (`name` or `name:variant`), each optionally followed by `--key=value` overrides
    #[arg(value_name = "TARGET", trailing_var_arg = true, allow_hyphen_values = true)]
    pub targets: Vec<String>,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub fn execute(self) -> anyhow::Result<i32> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("Cannot change directory to {}", dir.display()))?;
        }

        if self.plan {
            return commands::plan::execute(&self);
        }
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(commands::run::execute(&self))
    }

    pub fn mode(&self) -> Mode {
        if self.clean {
            Mode::Clean
        } else {
            Mode::Run
        }
    }

    /// Verbosity from the flags, falling back to the project setting
    pub fn verbosity(&self, config: &ProjectConfig) -> Verbosity {
        if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            self.verbosity.unwrap_or(config.settings.verbosity)
        }
    }

    /// Raw selection tokens: `--set` values first, then the targets
    pub fn selection_tokens(&self) -> Vec<String> {
        self.set
            .iter()
            .map(|kv| format!("--{}", kv))
            .chain(self.targets.iter().cloned())
            .collect()
    }

    /// Load the project configuration
    pub fn load_config(&self) -> anyhow::Result<ProjectConfig> {
        let config = match &self.config {
            Some(path) => gantry_core::config::load_config(path)?,
            None => {
                let cwd = std::env::current_dir()?;
                gantry_core::config::load_config_from_dir(&cwd)?.0
            }
        };
        Ok(config)
    }
}
