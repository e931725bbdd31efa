//! Execution and grading of practice exercise submissions.
//!
//! Devdrill runs learner code for a coding practice platform. The run path
//! executes JavaScript in an embedded engine (or a small Python subset through
//! a line interpreter) and returns what the program printed. The submit path
//! grades a JavaScript function against a task's test cases and scores it.
//!
//! # Features
//!
//! - **Embedded sandbox**: a fresh JavaScript context per execution, with host globals shadowed.
//! - **Resource limits**: wall-clock timeouts, loop and recursion limits, output and length caps.
//! - **Auto-print**: bare expression statements on the run path echo their values.
//! - **Grading**: structural comparison of return values, partial credit and feedback.
//! - **TOML configuration**: limits and grading behavior loaded with the `config` crate.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, EvaluationConfig, Language, SandboxConfig};
pub use evaluator::Evaluator;
pub use interpreter::{InterpretError, run_python};
pub use rewrite::ScreenError;
pub use runner::{
    RunRequest, RunResponse, Runner, SubmitError, SubmitRequest, SubmitResponse,
};
pub use sandbox::{Sandbox, SandboxError};
pub use types::{
    EvaluationResult, ExecutionLimits, ExecutionOutcome, Task, TestCase, TestOutcome,
};
pub use value::{Value, deep_equal};

pub mod config;
pub mod evaluator;
pub mod interpreter;
pub mod rewrite;
pub mod runner;
pub mod sandbox;
pub mod types;
pub mod value;
