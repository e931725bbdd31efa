use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Wall-clock budget used when no limit is configured
pub const DEFAULT_WALL_TIME_MS: u64 = 5000;

/// Message rendered when a run produces neither output nor a return value
pub const NO_OUTPUT_MESSAGE: &str = "Code executed successfully (no output)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Wall clock budget in milliseconds
    #[serde(default)]
    pub wall_time_ms: Option<u64>,

    /// Maximum iterations of any single loop, also the cap on loop-body and
    /// function-body entries over a whole execution
    #[serde(default)]
    pub loop_iteration_limit: Option<u64>,

    /// Maximum call depth (engine default when unset)
    #[serde(default)]
    pub recursion_limit: Option<usize>,

    /// Maximum source length in characters
    #[serde(default)]
    pub max_code_length: Option<usize>,

    /// Maximum number of captured console lines
    #[serde(default)]
    pub max_output_lines: Option<usize>,
}

impl ExecutionLimits {
    /// Create new execution limits with the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits with every field unset, useful as an override base
    pub fn unset() -> Self {
        Self {
            wall_time_ms: None,
            loop_iteration_limit: None,
            recursion_limit: None,
            max_code_length: None,
            max_output_lines: None,
        }
    }

    /// Set the wall clock budget in milliseconds
    pub fn with_wall_time_ms(mut self, ms: u64) -> Self {
        self.wall_time_ms = Some(ms);
        self
    }

    /// Set the loop iteration limit
    pub fn with_loop_iteration_limit(mut self, iterations: u64) -> Self {
        self.loop_iteration_limit = Some(iterations);
        self
    }

    /// Set the recursion limit
    pub fn with_recursion_limit(mut self, depth: usize) -> Self {
        self.recursion_limit = Some(depth);
        self
    }

    /// Set the maximum source length
    pub fn with_max_code_length(mut self, chars: usize) -> Self {
        self.max_code_length = Some(chars);
        self
    }

    /// Set the captured output line cap
    pub fn with_max_output_lines(mut self, lines: usize) -> Self {
        self.max_output_lines = Some(lines);
        self
    }

    /// The wall clock budget as a [`Duration`]
    pub fn wall_time(&self) -> Duration {
        Duration::from_millis(self.wall_time_ms.unwrap_or(DEFAULT_WALL_TIME_MS))
    }

    /// Apply overrides from another ExecutionLimits, preferring values from `overrides`
    pub fn with_overrides(&self, overrides: &ExecutionLimits) -> ExecutionLimits {
        ExecutionLimits {
            wall_time_ms: overrides.wall_time_ms.or(self.wall_time_ms),
            loop_iteration_limit: overrides.loop_iteration_limit.or(self.loop_iteration_limit),
            recursion_limit: overrides.recursion_limit.or(self.recursion_limit),
            max_code_length: overrides.max_code_length.or(self.max_code_length),
            max_output_lines: overrides.max_output_lines.or(self.max_output_lines),
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            wall_time_ms: Some(DEFAULT_WALL_TIME_MS),
            loop_iteration_limit: Some(10_000_000),
            recursion_limit: None,
            max_code_length: Some(10_000),
            max_output_lines: Some(1000),
        }
    }
}

/// A programming exercise as supplied by the task generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,

    /// Name of the function a submission must define
    pub function_name: String,

    pub test_cases: Vec<TestCase>,

    #[serde(default = "default_difficulty")]
    pub difficulty: u32,

    /// Points awarded for passing every test case
    pub points: u32,

    #[serde(default)]
    pub category: Option<String>,
}

fn default_difficulty() -> u32 {
    1
}

/// One row of a task's test list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Arguments passed to the entry point, in order
    #[serde(default)]
    pub input: Vec<serde_json::Value>,

    pub expected: serde_json::Value,

    #[serde(default)]
    pub description: String,
}

impl TestCase {
    /// The expected return value converted to a runtime value
    pub fn expected_value(&self) -> Value {
        Value::from(&self.expected)
    }
}

/// Verdict for a whole submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub passed: bool,
    pub score: u32,
    pub feedback: String,
    pub test_results: Vec<TestOutcome>,
}

impl EvaluationResult {
    /// Number of test cases that passed
    pub fn passed_count(&self) -> usize {
        self.test_results.iter().filter(|t| t.passed).count()
    }
}

/// Result of a single test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output captured from a run-path execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Captured console lines, in emission order
    pub logs: Vec<String>,

    /// Explicit return value of the program, if any
    pub result: Option<Value>,

    /// Whether console output was cut at the line cap
    pub truncated: bool,
}

impl ExecutionOutcome {
    /// Render the outcome as the text shown to the user
    pub fn render(&self) -> String {
        let mut output = self.logs.join("\n");

        if self.truncated {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str("[output truncated]");
        }

        if let Some(result) = self.result.as_ref().filter(|v| !v.is_nullish()) {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str("Return value: ");
            output.push_str(&result.format());
        }

        if output.is_empty() {
            NO_OUTPUT_MESSAGE.to_string()
        } else {
            output
        }
    }
}
