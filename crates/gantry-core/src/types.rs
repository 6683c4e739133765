//! Shared types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Identifies one invocation request: a target name and an optional variant.
///
/// Written as `name` or `name:variant` on the command line and in
/// `depends_on` lists.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetInstanceId {
    /// Declared target name
    pub target: String,
    /// Variant name, if a parameterized instance was requested
    pub variant: Option<String>,
}

impl TargetInstanceId {
    /// Create an id for the plain target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            variant: None,
        }
    }

    /// Create an id for a variant of a target
    pub fn with_variant(target: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            variant: Some(variant.into()),
        }
    }

    /// Parse a selector in `name` or `name:variant` form
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let mut parts = s.split(':');
        let target = parts.next().unwrap_or_default();
        let variant = parts.next();

        if parts.next().is_some() || !is_valid_name(target) {
            return Err(ConfigError::invalid("selector", format!("'{}' is not a valid target selector", s)));
        }

        match variant {
            None => Ok(Self::new(target)),
            Some(v) if is_valid_name(v) => Ok(Self::with_variant(target, v)),
            Some(_) => Err(ConfigError::invalid("selector", format!("'{}' has an empty variant", s))),
        }
    }
}

impl FromStr for TargetInstanceId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}:{}", self.target, variant),
            None => write!(f, "{}", self.target),
        }
    }
}

/// Whether a name can be used as a target or variant identifier
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.contains(':') && !name.contains(char::is_whitespace)
}

/// How much effect-level output the orchestrator produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Only failures and the final summary
    Quiet,
    /// One line per effect
    #[default]
    Normal,
    /// Effects plus command lines and captured output
    Verbose,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Normal => "normal",
            Self::Verbose => "verbose",
        }
    }
}

impl FromStr for Verbosity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quiet" => Ok(Self::Quiet),
            "normal" => Ok(Self::Normal),
            "verbose" => Ok(Self::Verbose),
            other => Err(ConfigError::invalid(
                "verbosity",
                format!("'{}' must be one of: quiet, normal, verbose", other),
            )),
        }
    }
}

/// Whether the orchestrator runs targets forward or cleans them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Run,
    Clean,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_id_display() {
        assert_eq!(TargetInstanceId::new("build").to_string(), "build");
        assert_eq!(
            TargetInstanceId::with_variant("file/copy", "hosts").to_string(),
            "file/copy:hosts"
        );
    }

    #[test]
    fn test_target_id_parse() {
        let id = TargetInstanceId::parse("file/copy:hosts").unwrap();
        assert_eq!(id.target, "file/copy");
        assert_eq!(id.variant.as_deref(), Some("hosts"));

        let plain: TargetInstanceId = "build".parse().unwrap();
        assert_eq!(plain, TargetInstanceId::new("build"));
    }

    #[test]
    fn test_target_id_parse_invalid() {
        assert!(TargetInstanceId::parse("").is_err());
        assert!(TargetInstanceId::parse("a:b:c").is_err());
        assert!(TargetInstanceId::parse("copy:").is_err());
        assert!(TargetInstanceId::parse("--flag").is_err());
    }

    #[test]
    fn test_target_id_structural_equality() {
        assert_eq!(
            TargetInstanceId::parse("copy:hosts").unwrap(),
            TargetInstanceId::with_variant("copy", "hosts")
        );
        assert_ne!(TargetInstanceId::new("copy"), TargetInstanceId::with_variant("copy", "hosts"));
    }

    #[test]
    fn test_verbosity_parse() {
        assert_eq!("quiet".parse::<Verbosity>().unwrap(), Verbosity::Quiet);
        assert_eq!(Verbosity::default(), Verbosity::Normal);
        assert!("loud".parse::<Verbosity>().is_err());
    }
}
