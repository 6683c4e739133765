//! Command-line target selection
//!
//! Tokens are either selectors (`name` or `name:variant`) or flags
//! (`--key=value`, `--key`). Flags before the first selector are global;
//! later flags belong to the most recently named selector.

use gantry_core::config::{flag_table, merge_tables};
use gantry_core::{ConfigError, TargetInstanceId};

/// One selector with the flags scoped to it
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedTarget {
    pub id: TargetInstanceId,
    pub flags: toml::Table,
}

impl RequestedTarget {
    pub fn new(id: TargetInstanceId) -> Self {
        Self {
            id,
            flags: toml::Table::new(),
        }
    }
}

/// Parsed positional arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selectors in command-line order
    pub requested: Vec<RequestedTarget>,
    /// Flags given before any selector
    pub global: toml::Table,
}

impl Selection {
    pub fn parse<I, S>(tokens: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::default();
        for token in tokens {
            let token = token.as_ref();
            match token.strip_prefix("--") {
                Some(flag) => {
                    if flag.is_empty() || flag.starts_with('=') {
                        return Err(ConfigError::MalformedOverride(token.to_string()));
                    }
                    let table = flag_table(flag)?;
                    let scope = match selection.requested.last_mut() {
                        Some(requested) => &mut requested.flags,
                        None => &mut selection.global,
                    };
                    merge_tables(scope, &table);
                }
                None => {
                    let id = TargetInstanceId::parse(token)
                        .map_err(|_| ConfigError::MalformedOverride(token.to_string()))?;
                    selection.requested.push(RequestedTarget::new(id));
                }
            }
        }
        Ok(selection)
    }

    /// A selection of plain targets without flags
    pub fn of<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = TargetInstanceId>,
    {
        Self {
            requested: ids.into_iter().map(RequestedTarget::new).collect(),
            global: toml::Table::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }
}
