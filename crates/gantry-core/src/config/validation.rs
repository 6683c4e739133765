//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::types::{is_valid_name, TargetInstanceId};

use super::types::ProjectConfig;

/// Validate configuration
pub fn validate_project(config: &ProjectConfig) -> Result<()> {
    debug!("validating configuration");
    validate_settings(config)?;
    validate_targets(config)?;
    validate_overrides(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_settings(config: &ProjectConfig) -> Result<()> {
    if config.settings.concurrency == 0 {
        return Err(ConfigError::invalid("settings.concurrency", "must be greater than zero").into());
    }
    Ok(())
}

fn validate_targets(config: &ProjectConfig) -> Result<()> {
    for (name, target) in &config.targets {
        if !is_valid_name(name) {
            return Err(ConfigError::invalid(
                format!("targets.{}", name),
                "target names must be non-empty and cannot contain ':' or whitespace",
            )
            .into());
        }

        if target.function.is_empty() {
            return Err(ConfigError::MissingField(format!("targets.{}.function", name)).into());
        }

        for variant in target.variants.keys() {
            if !is_valid_name(variant) {
                return Err(ConfigError::invalid(
                    format!("targets.{}.variants.{}", name, variant),
                    "invalid variant name",
                )
                .into());
            }
        }

        for dep in &target.depends_on {
            validate_dependency(config, name, dep)?;
        }
    }
    Ok(())
}

fn validate_dependency(config: &ProjectConfig, owner: &str, selector: &str) -> Result<()> {
    let id = TargetInstanceId::parse(selector).map_err(|_| {
        ConfigError::invalid(
            format!("targets.{}.depends_on", owner),
            format!("'{}' is not a valid target selector", selector),
        )
    })?;

    let target = config
        .target(&id.target)
        .ok_or_else(|| ConfigError::UnknownTarget(id.target.clone()))?;

    if let Some(variant) = &id.variant {
        if !target.variants.contains_key(variant) {
            return Err(ConfigError::UnknownVariant {
                target: id.target.clone(),
                variant: variant.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn validate_overrides(config: &ProjectConfig) -> Result<()> {
    for name in config.overrides.keys() {
        if config.targets.contains_key(name) {
            return Err(ConfigError::invalid(
                format!("overrides.{}", name),
                "an override target cannot share its name with a target",
            )
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetDefinition;
    use crate::error::GantryError;

    fn project() -> ProjectConfig {
        let mut config = ProjectConfig::default();
        config.targets.insert(
            "a".to_string(),
            TargetDefinition::new("exec").with_variant("fast", toml::Table::new()),
        );
        config
            .targets
            .insert("b".to_string(), TargetDefinition::new("exec").with_depends_on("a:fast"));
        config
    }

    #[test]
    fn test_valid_project() {
        assert!(validate_project(&project()).is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = project();
        config.settings.concurrency = 0;
        assert!(validate_project(&config).is_err());
    }

    #[test]
    fn test_missing_function_rejected() {
        let mut config = project();
        config.targets.insert("c".to_string(), TargetDefinition::default());
        let err = validate_project(&config).unwrap_err();
        assert!(matches!(err, GantryError::Config(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let mut config = project();
        config
            .targets
            .insert("c".to_string(), TargetDefinition::new("exec").with_depends_on("a:slow"));
        let err = validate_project(&config).unwrap_err();
        assert!(matches!(
            err,
            GantryError::Config(ConfigError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn test_malformed_dependency_rejected() {
        let mut config = project();
        config
            .targets
            .insert("c".to_string(), TargetDefinition::new("exec").with_depends_on("a:b:c"));
        assert!(validate_project(&config).is_err());
    }

    #[test]
    fn test_override_name_clash_rejected() {
        let mut config = project();
        config.overrides.insert("a".to_string(), toml::Table::new());
        assert!(validate_project(&config).is_err());
    }
}
