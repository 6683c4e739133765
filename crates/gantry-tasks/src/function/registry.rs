//! Registry of functions by name

use std::collections::BTreeMap;
use std::fmt;

use gantry_core::ConfigError;
use tracing::debug;

use super::{Bound, Function, Invocable};
use crate::functions::{CopyFunction, ExecFunction};

type Factory = Box<dyn Fn(&str, &toml::Table) -> Result<Box<dyn Invocable>, ConfigError> + Send + Sync>;

/// Maps function names to constructors.
///
/// Built once at startup and passed to graph construction.
pub struct FunctionRegistry {
    factories: BTreeMap<String, Factory>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ExecFunction::NAME, ExecFunction::default);
        registry.register(CopyFunction::NAME, CopyFunction::default);
        registry
    }

    /// Register `constructor` under `name`, replacing any earlier entry.
    ///
    /// A fresh function value is built for every invocation.
    pub fn register<F, C>(&mut self, name: impl Into<String>, constructor: C)
    where
        F: Function,
        C: Fn() -> F + Send + Sync + 'static,
    {
        let name = name.into();
        let function_name = name.clone();
        let factory: Factory = Box::new(move |target: &str, config: &toml::Table| {
            let config: F::Config = toml::Value::Table(config.clone())
                .try_into()
                .map_err(|e: toml::de::Error| {
                    ConfigError::invalid(format!("targets.{}.config", target), e.message().to_string())
                })?;
            let function = constructor();
            function.validate(&config)?;
            Ok(Box::new(Bound::new(function_name.clone(), function, config)) as Box<dyn Invocable>)
        });
        debug!(function = %name, "registered function");
        self.factories.insert(name, factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Bind `function` to an isolated configuration for `target`
    pub fn instantiate(
        &self,
        target: &str,
        function: &str,
        config: &toml::Table,
    ) -> Result<Box<dyn Invocable>, ConfigError> {
        let factory = self
            .factories
            .get(function)
            .ok_or_else(|| ConfigError::UnknownFunction {
                target: target.to_string(),
                function: function.to_string(),
            })?;
        factory(target, config)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
