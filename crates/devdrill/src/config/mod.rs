use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::Language;
use crate::sandbox::DEFAULT_MAX_CONCURRENT;
use crate::types::ExecutionLimits;

pub mod language;
mod loader;

/// The documented default configuration, as written by `devdrill init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../devdrill.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("unknown language '{0}'")]
    UnknownLanguage(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Devdrill
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Limits applied to every execution.
    /// Individual requests may override them.
    #[serde(default)]
    pub limits: ExecutionLimits,

    /// Grading behavior
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Engine pool settings
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SandboxConfig {
    /// Maximum number of executions running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}

/// Settings for grading submissions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvaluationConfig {
    /// Require the task's entry point by name.
    ///
    /// When false, a submission that does not define the named function is
    /// graded against the first function it declares instead.
    #[serde(default)]
    pub strict_entry_point: bool,

    /// Maximum characters of an error message included in a test outcome
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,

    /// Maximum characters of a test description included in a test outcome
    #[serde(default = "default_description_limit")]
    pub description_limit: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            strict_entry_point: false,
            message_limit: default_message_limit(),
            description_limit: default_description_limit(),
        }
    }
}

fn default_message_limit() -> usize {
    100
}

fn default_description_limit() -> usize {
    200
}

impl Config {
    /// Create a new config from the embedded defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config from built-in values, without parsing the example file
    pub fn builtin() -> Self {
        Self {
            limits: ExecutionLimits::default(),
            evaluation: EvaluationConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }

    /// Merge execution limits with defaults
    pub fn effective_limits(&self, overrides: Option<&ExecutionLimits>) -> ExecutionLimits {
        match overrides {
            Some(limits) => self.limits.with_overrides(limits),
            None => self.limits.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}
