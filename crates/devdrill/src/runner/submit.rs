//! Submit path: screen a submission and grade it

use tracing::{info, instrument};

use crate::config::{Config, Language};
use crate::evaluator::Evaluator;
use crate::rewrite::{sanitize_code, screen_submission};
use crate::runner::{SubmitError, SubmitRequest};
use crate::types::{EvaluationResult, ExecutionLimits};

/// Screen and grade a submission
///
/// Only JavaScript is graded. Rejected code never reaches the sandbox.
#[instrument(skip(evaluator, config, request), fields(task = %request.task.id))]
pub async fn submit(
    evaluator: &Evaluator,
    config: &Config,
    request: &SubmitRequest,
) -> Result<EvaluationResult, SubmitError> {
    let language = request.language.unwrap_or_default();
    if !language.is_gradable() {
        return Err(SubmitError::UnsupportedLanguage(language));
    }

    let code = sanitize_code(&request.code);
    let max_length = config
        .limits
        .max_code_length
        .or(ExecutionLimits::default().max_code_length)
        .unwrap_or(usize::MAX);

    if let Err(e) = screen_submission(&code, max_length) {
        info!(reason = %e, "submission rejected");
        return Err(e.into());
    }

    Ok(evaluator.evaluate(&code, &request.task).await)
}
