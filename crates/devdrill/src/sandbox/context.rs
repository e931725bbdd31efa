//! Script builder for sandboxed executions
//!
//! Wraps user source in the harness that captures console output, hides host
//! globals and reports back through a JSON envelope.

use crate::rewrite::{insert_step_calls, is_identifier, strip_dangerous};
use crate::sandbox::SandboxError;
use crate::types::ExecutionLimits;

const PRELUDE: &str = include_str!("prelude.js");

/// What the harness does with the user source
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    /// Run the source and report its console output and return value
    AutoPrint,
    /// Run the source and report which function would be invoked
    Discover {
        entry: String,
        /// Names tried in order when `entry` is not defined
        fallbacks: Vec<String>,
    },
    /// Run the source and call `entry` with `args`
    Invoke {
        entry: String,
        args: Vec<serde_json::Value>,
    },
}

/// A single sandboxed execution, consumed when built
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    source: String,
    limits: ExecutionLimits,
    mode: ExecutionMode,
}

impl ExecutionContext {
    /// Create an auto-print execution of `source` with default limits
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            limits: ExecutionLimits::default(),
            mode: ExecutionMode::AutoPrint,
        }
    }

    /// Set the execution limits
    pub fn limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the execution mode
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn execution_limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    pub fn execution_mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// Build the script text handed to the engine
    ///
    /// Consumes self; the returned script evaluates to the envelope string.
    pub fn build(self) -> Result<String, SandboxError> {
        // Keep the cap representable as a JavaScript integer literal
        let max_lines = self
            .limits
            .max_output_lines
            .map_or(u64::MAX, |lines| lines as u64)
            .min(1 << 53);
        let prelude = PRELUDE.replace("__MAX_OUTPUT_LINES__", &max_lines.to_string());
        let source = insert_step_calls(&strip_dangerous(&self.source));

        let body = match &self.mode {
            ExecutionMode::AutoPrint => auto_print_body(&source),
            ExecutionMode::Discover { entry, fallbacks } => {
                let candidates = candidate_list(entry, fallbacks)?;
                discover_body(&source, &candidates)
            }
            ExecutionMode::Invoke { entry, args } => {
                let candidates = candidate_list(entry, &[])?;
                let args = serde_json::to_string(args)
                    .map_err(|e| SandboxError::Internal(format!("failed to encode arguments: {e}")))?;
                invoke_body(&source, &candidates, &args)
            }
        };

        Ok(format!("(function () {{\n{prelude}\n{body}\n}})()"))
    }
}

/// JavaScript array literal of `[name, binding-or-undefined]` pairs
fn candidate_list(entry: &str, fallbacks: &[String]) -> Result<String, SandboxError> {
    if !is_identifier(entry) {
        return Err(SandboxError::NoCallable(entry.to_string()));
    }

    let names = std::iter::once(entry)
        .chain(fallbacks.iter().map(String::as_str))
        .filter(|name| is_identifier(name));

    let mut pairs = Vec::new();
    for name in names {
        let quoted = serde_json::to_string(name)
            .map_err(|e| SandboxError::Internal(format!("failed to encode name: {e}")))?;
        pairs.push(format!(
            "[{quoted}, typeof {name} === \"function\" ? {name} : undefined]"
        ));
    }
    Ok(format!("[{}]", pairs.join(", ")))
}

fn user_function(source: &str, tail: &str) -> String {
    format!("(function () {{\n{source}\n;\n{tail}\n}})()")
}

fn auto_print_body(source: &str) -> String {
    let program = user_function(source, "return result;");
    format!(
        "var result;\n\
         var __value;\n\
         try {{\n\
         __value = {program};\n\
         }} catch (__error) {{\n\
         __emit(\"ERROR: \", [__message(__error)]);\n\
         }}\n\
         return __envelope(\"ok\", {{ value: __encode(__value, []) }});"
    )
}

fn discover_body(source: &str, candidates: &str) -> String {
    let program = user_function(source, &format!("return __resolve({candidates});"));
    format!(
        "var __found;\n\
         try {{\n\
         __found = {program};\n\
         }} catch (__error) {{\n\
         return __envelope(\"thrown\", {{ message: __message(__error) }});\n\
         }}\n\
         if (!__resolved(__found)) return __envelope(\"missing\", {{}});\n\
         return __envelope(\"ok\", {{ entry: __found.name }});"
    )
}

fn invoke_body(source: &str, candidates: &str, args: &str) -> String {
    let program = user_function(source, &format!("return __resolve({candidates});"));
    format!(
        "var __args = {args};\n\
         try {{\n\
         var __found = {program};\n\
         if (!__resolved(__found)) return __envelope(\"missing\", {{}});\n\
         var __value = __found.callable.apply(undefined, __args);\n\
         return __envelope(\"ok\", {{ entry: __found.name, value: __encode(__value, []) }});\n\
         }} catch (__error) {{\n\
         return __envelope(\"thrown\", {{ message: __message(__error) }});\n\
         }}"
    )
}
