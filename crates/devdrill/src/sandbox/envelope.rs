//! Envelope parsing
//!
//! Every harness script evaluates to a JSON string describing what happened.
//! This module turns that string back into Rust values.

use serde::Deserialize;

use crate::sandbox::SandboxError;
use crate::types::ExecutionOutcome;
use crate::value::Value;

/// Outcome reported by the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    /// The program ran to completion
    Ok,
    /// No candidate function was defined
    Missing,
    /// User code threw
    Thrown,
}

/// Parsed harness envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub status: EnvelopeStatus,

    /// Name of the resolved function, if any
    #[serde(default)]
    pub entry: Option<String>,

    /// Encoded result value
    #[serde(default)]
    pub value: Option<serde_json::Value>,

    /// Message of the thrown value
    #[serde(default)]
    pub message: Option<String>,

    /// Console lines as `[prefix, [encoded args]]`
    #[serde(default)]
    pub logs: Vec<(String, Vec<serde_json::Value>)>,

    #[serde(default)]
    pub truncated: bool,
}

impl Envelope {
    /// Parse the envelope text produced by a script
    pub fn parse(text: &str) -> Result<Self, SandboxError> {
        serde_json::from_str(text).map_err(|e| SandboxError::Protocol(e.to_string()))
    }

    /// Decode the result value, `undefined` when absent
    pub fn decoded_value(&self) -> Result<Value, SandboxError> {
        match &self.value {
            Some(wire) => Value::from_wire(wire).map_err(|e| SandboxError::Protocol(e.to_string())),
            None => Ok(Value::Undefined),
        }
    }

    /// Render console lines with their level prefixes
    pub fn rendered_logs(&self) -> Result<Vec<String>, SandboxError> {
        self.logs
            .iter()
            .map(|(prefix, args)| {
                let parts = args
                    .iter()
                    .map(|arg| {
                        Value::from_wire(arg)
                            .map(|value| value.to_display_string())
                            .map_err(|e| SandboxError::Protocol(e.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("{prefix}{}", parts.join(" ")))
            })
            .collect()
    }

    /// Convert a run-mode envelope into an [`ExecutionOutcome`]
    pub fn into_outcome(self) -> Result<ExecutionOutcome, SandboxError> {
        let logs = self.rendered_logs()?;
        let result = match self.decoded_value()? {
            Value::Undefined => None,
            value => Some(value),
        };

        Ok(ExecutionOutcome {
            logs,
            result,
            truncated: self.truncated,
        })
    }

    /// Message of a thrown value, or a placeholder
    pub fn thrown_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}
