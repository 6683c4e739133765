//! Resolved invocations

use gantry_core::{CommandDefaults, TargetInstanceId};

use crate::function::Invocable;

/// One executable instance of a target within a run
pub struct TargetInvocation {
    pub(crate) id: TargetInstanceId,
    pub(crate) function: String,
    pub(crate) description: Option<String>,
    pub(crate) config: toml::Table,
    pub(crate) layers: Vec<String>,
    pub(crate) command_defaults: CommandDefaults,
    pub(crate) dependencies: Vec<TargetInstanceId>,
    pub(crate) invocable: Box<dyn Invocable>,
}

impl TargetInvocation {
    pub fn id(&self) -> &TargetInstanceId {
        &self.id
    }

    /// Name of the function implementing this invocation
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The isolated configuration this invocation sees
    pub fn config(&self) -> &toml::Table {
        &self.config
    }

    /// Labels of the layers merged into [`config`](Self::config), lowest
    /// priority first
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn command_defaults(&self) -> &CommandDefaults {
        &self.command_defaults
    }

    /// Direct predecessors in declaration order
    pub fn dependencies(&self) -> &[TargetInstanceId] {
        &self.dependencies
    }

    pub fn invocable(&self) -> &dyn Invocable {
        self.invocable.as_ref()
    }
}

impl std::fmt::Debug for TargetInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetInvocation")
            .field("id", &self.id)
            .field("function", &self.function)
            .field("layers", &self.layers)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
