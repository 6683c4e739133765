//! The function contract
//!
//! A [`Function`] implements one kind of target. It is parameterized over its
//! configuration type; the [`FunctionRegistry`] erases that type so functions
//! can be looked up by the name a target declares.

mod context;
mod registry;

pub use context::{EffectBuilder, TaskContext};
pub use registry::FunctionRegistry;

use async_trait::async_trait;
use gantry_core::ConfigError;
use serde::de::DeserializeOwned;

use crate::error::TaskError;
use crate::incremental::SharedDependency;

/// One kind of target behaviour
#[async_trait]
pub trait Function: Send + Sync + 'static {
    /// Shape of the isolated configuration this function reads
    type Config: DeserializeOwned + Send + Sync + 'static;

    /// Reject configurations that deserialize but cannot work
    fn validate(&self, _config: &Self::Config) -> Result<(), ConfigError> {
        Ok(())
    }

    /// The dependency deciding whether `run` is needed.
    ///
    /// `None` means the function always runs.
    fn dependency(&self, _config: &Self::Config) -> Result<Option<SharedDependency>, TaskError> {
        Ok(None)
    }

    /// Perform the forward action
    async fn run(&self, config: &Self::Config, ctx: &TaskContext) -> Result<(), TaskError>;

    /// Remove what `run` produces; a no-op for artifacts that do not exist
    async fn clean(&self, config: &Self::Config, ctx: &TaskContext) -> Result<(), TaskError>;

    /// Ask an in-flight `run` or `clean` to stop early.
    ///
    /// May be called from any thread.
    fn cancel(&self) {}
}

/// A function bound to one invocation's configuration
#[async_trait]
pub trait Invocable: Send + Sync {
    fn function_name(&self) -> &str;

    fn dependency(&self) -> Result<Option<SharedDependency>, TaskError>;

    async fn run(&self, ctx: &TaskContext) -> Result<(), TaskError>;

    async fn clean(&self, ctx: &TaskContext) -> Result<(), TaskError>;

    fn cancel(&self);
}

pub(crate) struct Bound<F: Function> {
    name: String,
    function: F,
    config: F::Config,
}

impl<F: Function> Bound<F> {
    pub(crate) fn new(name: impl Into<String>, function: F, config: F::Config) -> Self {
        Self {
            name: name.into(),
            function,
            config,
        }
    }
}

#[async_trait]
impl<F: Function> Invocable for Bound<F> {
    fn function_name(&self) -> &str {
        &self.name
    }

    fn dependency(&self) -> Result<Option<SharedDependency>, TaskError> {
        self.function.dependency(&self.config)
    }

    async fn run(&self, ctx: &TaskContext) -> Result<(), TaskError> {
        self.function.run(&self.config, ctx).await
    }

    async fn clean(&self, ctx: &TaskContext) -> Result<(), TaskError> {
        self.function.clean(&self.config, ctx).await
    }

    fn cancel(&self) {
        self.function.cancel();
    }
}

impl std::fmt::Debug for dyn Invocable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocable")
            .field("function", &self.function_name())
            .finish()
    }
}
