//! Configuration types

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Verbosity;

use super::duration;

/// Main configuration for a gantry project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Orchestrator settings
    pub settings: Settings,

    /// Shared base configuration visible to every invocation
    pub config: toml::Table,

    /// Declared targets keyed by name
    pub targets: BTreeMap<String, TargetDefinition>,

    /// Override targets: named config blocks selectable on the command line
    pub overrides: BTreeMap<String, toml::Table>,
}

impl ProjectConfig {
    /// Look up a declared target
    pub fn target(&self, name: &str) -> Option<&TargetDefinition> {
        self.targets.get(name)
    }

    /// Look up an override target block
    pub fn override_block(&self, name: &str) -> Option<&toml::Table> {
        self.overrides.get(name)
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum concurrently running invocations
    pub concurrency: usize,

    /// Default verbosity when none is given on the command line
    pub verbosity: Verbosity,

    /// Timeout applied to commands that do not declare one
    #[serde(with = "duration")]
    pub default_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            verbosity: Verbosity::Normal,
            default_timeout: Duration::from_secs(600),
        }
    }
}

/// A named, statically declared unit of work
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDefinition {
    /// Registered function implementing this target
    pub function: String,

    /// Human-readable description
    pub description: Option<String>,

    /// Targets (`name` or `name:variant`) that must complete first
    pub depends_on: Vec<String>,

    /// Target-specific configuration subtree
    pub config: toml::Table,

    /// Named variants overriding parts of `config`
    pub variants: BTreeMap<String, toml::Table>,
}

impl TargetDefinition {
    /// Create a new target definition for a function
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Default::default()
        }
    }

    /// Add a dependency selector
    pub fn with_depends_on(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    /// Set a configuration value
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Add a named variant
    pub fn with_variant(mut self, name: impl Into<String>, overrides: toml::Table) -> Self {
        self.variants.insert(name.into(), overrides);
        self
    }
}

/// Defaults applied to every command an invocation issues.
///
/// Read from the `command` table of the isolated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDefaults {
    /// Wall-clock timeout per command
    #[serde(with = "duration::option")]
    pub timeout: Option<Duration>,

    /// Extra environment variables
    pub environment: BTreeMap<String, String>,

    /// Working directory
    pub work_dir: Option<std::path::PathBuf>,

    /// Whether the child inherits the orchestrator's environment
    pub inherit_parent_environment: Option<bool>,
}
