//! Configuration layering
//!
//! Layers are merged in increasing priority. Tables merge recursively, every
//! other value is replaced by the later layer.

use tracing::trace;

use crate::error::ConfigError;

/// Merge `overlay` into `base`, last writer wins per key
pub fn merge_tables(base: &mut toml::Table, overlay: &toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Look up a dotted key (`command.timeout`)
pub fn get_path<'a>(table: &'a toml::Table, key: &str) -> Option<&'a toml::Value> {
    let mut segments = key.split('.');
    let mut current = table.get(segments.next()?)?;
    for segment in segments {
        current = current.as_table()?.get(segment)?;
    }
    Some(current)
}

/// Set a dotted key, creating intermediate tables as needed
pub fn set_path(table: &mut toml::Table, key: &str, value: toml::Value) -> Result<(), ConfigError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::MalformedOverride(key.to_string()));
    }

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| ConfigError::MalformedOverride(key.to_string()))?;

    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !entry.is_table() {
            *entry = toml::Value::Table(toml::Table::new());
        }
        current = match entry {
            toml::Value::Table(t) => t,
            _ => unreachable!("entry was just replaced with a table"),
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}

/// Interpret a raw flag value as a TOML scalar or array, falling back to a string
pub fn parse_flag_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

/// Parse a `key=value` flag (without leading dashes) into a one-key table
pub fn flag_table(flag: &str) -> Result<toml::Table, ConfigError> {
    let (key, value) = match flag.split_once('=') {
        Some((key, value)) => (key, parse_flag_value(value)),
        None => (flag, toml::Value::Boolean(true)),
    };
    if key.is_empty() {
        return Err(ConfigError::MalformedOverride(flag.to_string()));
    }
    let mut table = toml::Table::new();
    set_path(&mut table, key, value)?;
    Ok(table)
}

/// An ordered stack of labeled configuration layers
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    layers: Vec<(String, toml::Table)>,
}

impl ConfigLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a layer with higher priority than all previous ones
    pub fn push(&mut self, label: impl Into<String>, table: &toml::Table) -> &mut Self {
        if !table.is_empty() {
            self.layers.push((label.into(), table.clone()));
        }
        self
    }

    /// Labels of the non-empty layers, lowest priority first
    pub fn labels(&self) -> Vec<&str> {
        self.layers.iter().map(|(label, _)| label.as_str()).collect()
    }

    /// Collapse the stack into one table
    pub fn resolve(&self) -> toml::Table {
        let mut resolved = toml::Table::new();
        for (label, layer) in &self.layers {
            trace!(layer = %label, keys = layer.len(), "merging config layer");
            merge_tables(&mut resolved, layer);
        }
        resolved
    }
}
