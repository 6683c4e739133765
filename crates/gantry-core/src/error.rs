//! Error types for gantry

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using GantryError
pub type Result<T> = std::result::Result<T, GantryError>;

/// Main error type for gantry configuration operations
#[derive(Debug, Error)]
pub enum GantryError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
///
/// All of these are fatal and reported before any invocation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// A selector or dependency names a target that is not declared
    #[error("Unknown target '{0}'")]
    UnknownTarget(String),

    /// A selector names a variant the target does not declare
    #[error("Target '{target}' has no variant '{variant}'")]
    UnknownVariant { target: String, variant: String },

    /// A target references a function that is not registered
    #[error("Target '{target}' uses unknown function '{function}'")]
    UnknownFunction { target: String, function: String },

    /// Declared dependencies form a cycle
    #[error("Cyclic dependency detected among targets: {0}")]
    CyclicDependency(String),

    /// A `--key=value` override could not be understood
    #[error("Malformed override '{0}'")]
    MalformedOverride(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
