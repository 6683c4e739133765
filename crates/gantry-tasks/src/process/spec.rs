//! Command specifications

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wall-clock timeout for a command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// How a raw command outcome is turned into success or error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Always return the outcome
    NoPolicy,
    /// Error unless the process ran to completion, whatever its exit code
    RequireCompleted,
    /// Error unless the process completed with exit code 0
    #[default]
    RequireZeroStatus,
}

/// Everything needed to run one external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub timeout: Duration,
    pub policy: Policy,
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub work_dir: Option<PathBuf>,
    pub inherit_parent_env: bool,
    pub capture_output: bool,
}

impl CommandSpec {
    /// Create a spec with default timeout, strict policy, inherited environment
    /// and captured output
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            policy: Policy::default(),
            executable: executable.into(),
            args: Vec::new(),
            environment: BTreeMap::new(),
            work_dir: None,
            inherit_parent_env: true,
            capture_output: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn with_inherit_parent_env(mut self, inherit: bool) -> Self {
        self.inherit_parent_env = inherit;
        self
    }

    pub fn with_capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}
