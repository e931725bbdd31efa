//! Request handling for Devdrill
//!
//! Provides the run and submit entry points used by the front end: run
//! executes code and returns what it printed, submit grades code against a
//! task.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::runner::execute::{run_javascript, run_python_source};
pub use crate::runner::submit::submit;

mod execute;
mod submit;

use crate::{
    config::{Config, Language},
    evaluator::Evaluator,
    rewrite::ScreenError,
    sandbox::Sandbox,
    types::{EvaluationResult, ExecutionLimits, Task},
};

/// Request to execute code and capture its output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub code: String,
    pub language: Language,
    /// Optional limits overriding the configured ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ExecutionLimits>,
}

impl RunRequest {
    pub fn new(code: impl Into<String>, language: Language) -> Self {
        Self {
            code: code.into(),
            language,
            limits: None,
        }
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// Text shown to the user for a run, serialized as `{"output": ..}` or `{"error": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunResponse {
    Output { output: String },
    Error { error: String },
}

impl RunResponse {
    pub fn output(text: impl Into<String>) -> Self {
        RunResponse::Output {
            output: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        RunResponse::Error { error: text.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RunResponse::Error { .. })
    }

    /// The output or error text
    pub fn text(&self) -> &str {
        match self {
            RunResponse::Output { output } => output,
            RunResponse::Error { error } => error,
        }
    }
}

/// Request to grade code against a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub code: String,
    pub task: Task,
    /// Defaults to JavaScript
    #[serde(default)]
    pub language: Option<Language>,
}

/// Response body of a graded submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub evaluation: EvaluationResult,
}

/// Reasons a submission is not graded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("submissions in {0} cannot be graded")]
    UnsupportedLanguage(Language),

    #[error(transparent)]
    Rejected(#[from] ScreenError),
}

/// High-level entry point for running and grading code
#[derive(Debug, Clone)]
pub struct Runner {
    config: Config,
    evaluator: Evaluator,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        let sandbox = Sandbox::new(config.limits.clone())
            .with_max_concurrent(config.sandbox.max_concurrent);
        let evaluator = Evaluator::new(sandbox, config.evaluation.clone());
        Self { config, evaluator }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute code and render what it printed
    pub async fn run(&self, request: &RunRequest) -> RunResponse {
        let sandbox = self
            .evaluator
            .sandbox()
            .with_limits(self.config.effective_limits(request.limits.as_ref()));

        match request.language {
            Language::JavaScript => run_javascript(&sandbox, &request.code).await,
            Language::Python => run_python_source(&request.code),
        }
    }

    /// Grade a submission against its task
    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, SubmitError> {
        let evaluation = submit::submit(&self.evaluator, &self.config, request).await?;
        Ok(SubmitResponse { evaluation })
    }
}
