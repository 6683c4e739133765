//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::ProjectConfig;
use super::validation::validate_project;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    let format = if path
        .extension()
        .is_some_and(|e| e == "yaml" || e == "yml")
    {
        "YAML"
    } else {
        "TOML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content, format == "YAML")?;

    validate_project(&config)?;
    debug!(path = %path.display(), targets = config.targets.len(), "config loaded and validated");
    Ok(config)
}

/// Parse configuration text without validating it
pub fn parse_config(content: &str, yaml: bool) -> Result<ProjectConfig> {
    let config = if yaml {
        serde_yaml::from_str(content).map_err(ConfigError::YamlError)?
    } else {
        toml::from_str(content).map_err(ConfigError::TomlError)?
    };
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// The first match wins. Parents are walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.is_file() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(ProjectConfig, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}
