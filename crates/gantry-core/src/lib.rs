//! gantry Core - configuration and error types for the task orchestrator
//!
//! This crate owns the declarative side of gantry: the project file format,
//! its loading and validation, and the layering rules used to compute the
//! configuration each invocation sees.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CommandDefaults, ProjectConfig, Settings, TargetDefinition};
pub use error::{ConfigError, GantryError, Result};
pub use types::{Mode, TargetInstanceId, Verbosity};
