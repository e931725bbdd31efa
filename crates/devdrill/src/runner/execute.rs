//! Run path: execute code and render its output

use tracing::{debug, instrument};

use crate::interpreter::run_python;
use crate::rewrite::{instrument_auto_print, sanitize_code};
use crate::runner::RunResponse;
use crate::sandbox::{Sandbox, SandboxError};
use crate::types::ExecutionLimits;
use crate::value::number_to_string;

const MISSING_CODE: &str = "Missing required fields";

/// Run JavaScript with expression statements echoed to the output
#[instrument(skip(sandbox, code), fields(len = code.len()))]
pub async fn run_javascript(sandbox: &Sandbox, code: &str) -> RunResponse {
    if code.is_empty() {
        return RunResponse::error(MISSING_CODE);
    }

    let code = sanitize_code(code);
    let limits = sandbox.limits().clone();
    if let Some(max) = limits.max_code_length {
        let actual = code.chars().count();
        if actual > max {
            return RunResponse::error(SandboxError::CodeTooLarge { max, actual }.to_string());
        }
    }

    // The length cap applies to what the user wrote, not the instrumented source
    let sandbox = sandbox.with_limits(ExecutionLimits {
        max_code_length: None,
        ..limits
    });
    match sandbox.run(&instrument_auto_print(&code)).await {
        Ok(outcome) => RunResponse::output(outcome.render()),
        Err(e) => {
            debug!(error = %e, "run failed");
            RunResponse::error(describe_error(&e))
        }
    }
}

/// Run a Python-subset program through the line interpreter
#[instrument(skip(code), fields(len = code.len()))]
pub fn run_python_source(code: &str) -> RunResponse {
    if code.is_empty() {
        return RunResponse::error(MISSING_CODE);
    }

    match run_python(&sanitize_code(code)) {
        Ok(output) => RunResponse::output(output),
        Err(e) => {
            debug!(error = %e, "python run failed");
            RunResponse::error(format!("Python execution error: {e}"))
        }
    }
}

fn describe_error(error: &SandboxError) -> String {
    match error {
        SandboxError::Timeout { wall_time_ms } => format!(
            "Code execution timeout ({} seconds)",
            number_to_string(*wall_time_ms as f64 / 1000.0)
        ),
        SandboxError::Runtime(message) => format!("Runtime Error: {message}"),
        other => other.to_string(),
    }
}
