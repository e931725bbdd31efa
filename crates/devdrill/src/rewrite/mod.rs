//! Source rewriting and screening
//!
//! Pure text transforms applied to submitted code before it reaches the
//! sandbox: auto-print instrumentation for the run path, step counting,
//! function discovery for grading, and the sanitizing and screening passes.

use thiserror::Error;

mod autoprint;
mod functions;
mod scan;
mod screen;
mod steps;

pub use autoprint::instrument_auto_print;
pub use functions::{declared_functions, is_identifier};
pub use screen::{sanitize_code, screen_submission, strip_dangerous};
pub use steps::{STEP_FUNCTION, insert_step_calls};

/// Reasons a submission is refused before grading
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenError {
    #[error("Code cannot be empty")]
    Empty,

    #[error("Code too long (maximum {max} characters, got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Code contains potentially unsafe patterns ({0})")]
    UnsafePattern(&'static str),
}
