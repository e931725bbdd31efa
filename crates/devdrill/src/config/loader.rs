//! Configuration file loading for Devdrill
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};
use crate::types::ExecutionLimits;

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::ReadFile {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            });
        }

        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        Self::finish(config.try_deserialize()?)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        Self::finish(config.try_deserialize()?)
    }

    /// Fill limits missing from the file with the built-in defaults, then validate
    fn finish(mut config: Config) -> Result<Self, ConfigError> {
        config.limits = ExecutionLimits::default().with_overrides(&config.limits);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.wall_time_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "limits.wall_time_ms must be greater than zero".to_string(),
            ));
        }
        if self.limits.loop_iteration_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "limits.loop_iteration_limit must be greater than zero".to_string(),
            ));
        }
        if self.limits.max_code_length == Some(0) {
            return Err(ConfigError::Invalid(
                "limits.max_code_length must be greater than zero".to_string(),
            ));
        }
        if self.sandbox.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "sandbox.max_concurrent must be greater than zero".to_string(),
            ));
        }
        if self.evaluation.message_limit == 0 || self.evaluation.description_limit == 0 {
            return Err(ConfigError::Invalid(
                "evaluation limits must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.limits, ExecutionLimits::default());
        assert!(!config.evaluation.strict_entry_point);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[limits]
wall_time_ms = 2000
loop_iteration_limit = 500000
recursion_limit = 256
max_code_length = 4000
max_output_lines = 50

[evaluation]
strict_entry_point = true
message_limit = 80
description_limit = 120

[sandbox]
max_concurrent = 2
"#;

        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.limits.wall_time_ms, Some(2000));
        assert_eq!(config.limits.loop_iteration_limit, Some(500_000));
        assert_eq!(config.limits.recursion_limit, Some(256));
        assert_eq!(config.limits.max_code_length, Some(4000));
        assert_eq!(config.limits.max_output_lines, Some(50));
        assert!(config.evaluation.strict_entry_point);
        assert_eq!(config.evaluation.message_limit, 80);
        assert_eq!(config.evaluation.description_limit, 120);
        assert_eq!(config.sandbox.max_concurrent, 2);
    }

    #[test]
    fn test_invalid_zero_concurrency() {
        let toml = r#"
[sandbox]
max_concurrent = 0
"#;

        let result = Config::parse_toml(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_limits_keep_other_defaults() {
        let toml = r#"
[limits]
wall_time_ms = 1000
"#;

        let config = Config::parse_toml(toml).unwrap();
        let defaults = ExecutionLimits::default();
        assert_eq!(config.limits.wall_time_ms, Some(1000));
        assert_eq!(config.limits.loop_iteration_limit, defaults.loop_iteration_limit);
        assert_eq!(config.limits.max_code_length, defaults.max_code_length);
        assert_eq!(config.limits.max_output_lines, defaults.max_output_lines);
        assert_eq!(config.limits.recursion_limit, None);
    }

    #[test]
    fn test_invalid_zero_wall_time() {
        let toml = r#"
[limits]
wall_time_ms = 0
"#;

        let result = Config::parse_toml(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_type() {
        let toml = r#"
[limits]
wall_time_ms = "soon"
"#;

        let result = Config::parse_toml(toml);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/devdrill.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
