//! Grading of submissions against a task's test cases

use tracing::{debug, info, instrument, warn};

use crate::config::EvaluationConfig;
use crate::sandbox::{Sandbox, SandboxError};
use crate::types::{EvaluationResult, Task, TestCase, TestOutcome};
use crate::value::deep_equal;

/// Description of the single outcome reported when setup fails
const SETUP_DESCRIPTION: &str = "Code compilation";

const TIMEOUT_MESSAGE: &str = "Code execution timeout";

/// Grades submissions by running each test case in a fresh sandbox context
#[derive(Debug, Clone)]
pub struct Evaluator {
    sandbox: Sandbox,
    config: EvaluationConfig,
}

impl Evaluator {
    pub fn new(sandbox: Sandbox, config: EvaluationConfig) -> Self {
        Self { sandbox, config }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Grade `code` against every test case of `task`
    ///
    /// Failures never escape: a submission that cannot be loaded yields a
    /// single failed "Code compilation" outcome, and errors raised by a test
    /// case are recorded on that case.
    #[instrument(skip(self, code, task), fields(task = %task.id, cases = task.test_cases.len()))]
    pub async fn evaluate(&self, code: &str, task: &Task) -> EvaluationResult {
        let allow_fallback = !self.config.strict_entry_point;
        let entry = match self
            .sandbox
            .discover(code, &task.function_name, allow_fallback)
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "submission failed to load");
                return self.setup_failure(&e);
            }
        };

        let mut outcomes = Vec::with_capacity(task.test_cases.len());
        for (index, case) in task.test_cases.iter().enumerate() {
            let outcome = self.run_case(code, &entry, case).await;
            debug!(index, passed = outcome.passed, "test case finished");
            outcomes.push(outcome);
        }

        let result = grade(task, outcomes);
        info!(
            passed = result.passed,
            score = result.score,
            passed_cases = result.passed_count(),
            "evaluation complete"
        );
        result
    }

    async fn run_case(&self, code: &str, entry: &str, case: &TestCase) -> TestOutcome {
        let description = truncate_chars(&escape_html(&case.description), self.config.description_limit);

        let error = match self.sandbox.invoke(code, entry, &case.input).await {
            Ok(actual) => {
                let expected = case.expected_value();
                if deep_equal(&actual, &expected) {
                    None
                } else {
                    Some(format!(
                        "Expected {}, got {}",
                        expected.to_compact_json(),
                        actual.to_compact_json()
                    ))
                }
            }
            Err(SandboxError::Timeout { .. }) => {
                Some(format!("Runtime error: {TIMEOUT_MESSAGE}"))
            }
            Err(e) => Some(format!(
                "Runtime error: {}",
                truncate_chars(&e.to_string(), self.config.message_limit)
            )),
        };

        TestOutcome {
            passed: error.is_none(),
            description,
            error,
        }
    }

    fn setup_failure(&self, error: &SandboxError) -> EvaluationResult {
        let message = match error {
            SandboxError::Timeout { .. } => TIMEOUT_MESSAGE.to_string(),
            other => truncate_chars(&other.to_string(), self.config.message_limit),
        };

        EvaluationResult {
            passed: false,
            score: 0,
            feedback: format!("Code evaluation failed: {message}"),
            test_results: vec![TestOutcome {
                passed: false,
                description: SETUP_DESCRIPTION.to_string(),
                error: Some(message),
            }],
        }
    }
}

/// Score the outcomes and pick feedback
fn grade(task: &Task, outcomes: Vec<TestOutcome>) -> EvaluationResult {
    let total = outcomes.len();
    let passed_cases = outcomes.iter().filter(|o| o.passed).count();
    let passed = passed_cases == total;

    let (score, feedback) = if passed {
        (
            task.points,
            format!(
                "Excellent! You passed all {total} test cases and earned {} points!",
                task.points
            ),
        )
    } else {
        // floor(passed / total * points * 0.5) in exact integer arithmetic
        let partial = (passed_cases as u64 * u64::from(task.points)) / (2 * total as u64);
        (
            u32::try_from(partial).unwrap_or(task.points),
            format!(
                "You passed {passed_cases} out of {total} test cases. {}",
                encouragement(passed_cases, total)
            ),
        )
    };

    EvaluationResult {
        passed,
        score,
        feedback,
        test_results: outcomes,
    }
}

fn encouragement(passed: usize, total: usize) -> &'static str {
    if passed == 0 {
        "Don't give up! Check the requirements and try a different approach."
    } else if passed * 2 < total {
        "You're on the right track! Review the failing test cases for clues."
    } else {
        "Almost there! Check the edge cases that might be failing."
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Keep at most `limit` characters
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
