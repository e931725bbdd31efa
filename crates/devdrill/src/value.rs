//! Runtime values extracted from executed code
//!
//! Values cross the engine boundary in a tagged JSON encoding (see
//! [`Value::from_wire`]) so that `undefined`, functions and cyclic references
//! survive the trip. This module renders them for display and compares them
//! structurally for grading.

use serde_json::Number;
use thiserror::Error;

/// Largest integer a JavaScript number represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Error decoding a tagged wire value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed wire value: {0}")]
pub struct WireError(pub String);

/// A value produced by user code
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Key-value pairs in insertion order
    Object(Vec<(String, Value)>),
    /// A callable, carrying its textual form
    Function(String),
    /// A reference back to an enclosing value
    Circular,
}

impl Value {
    /// Whether the value is `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Look up a key on an object value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => lookup(entries, key),
            _ => None,
        }
    }

    /// Render the value for display, quoting strings
    ///
    /// Structures are rendered as two-space indented JSON. Structures that
    /// cannot be serialized fall back to [`coerce_string`](Self::coerce_string).
    pub fn format(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::String(s) => format!("\"{s}\""),
            Value::Array(_) | Value::Object(_) => self.pretty_or_coerce(),
            _ => self.coerce_string(),
        }
    }

    /// Render the value the way console output shows it: strings unquoted
    pub fn to_display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self.pretty_or_coerce(),
            _ => self.coerce_string(),
        }
    }

    /// Compact JSON text, `undefined` for values JSON cannot represent
    pub fn to_compact_json(&self) -> String {
        match self {
            Value::Undefined | Value::Function(_) => "undefined".to_string(),
            _ => match self.to_json() {
                Ok(json) => json.to_string(),
                Err(()) => self.coerce_string(),
            },
        }
    }

    /// Generic string coercion
    pub fn coerce_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null | Value::Circular => String::new(),
                    other => other.coerce_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(text) => text.clone(),
            Value::Circular => "[Circular]".to_string(),
        }
    }

    fn pretty_or_coerce(&self) -> String {
        self.to_json()
            .ok()
            .and_then(|json| serde_json::to_string_pretty(&json).ok())
            .unwrap_or_else(|| self.coerce_string())
    }

    /// Convert to JSON following `JSON.stringify` rules
    ///
    /// Fails if the value contains a circular reference.
    fn to_json(&self) -> Result<serde_json::Value, ()> {
        Ok(match self {
            Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_, _>>()?,
            ),
            Value::Object(entries) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    if matches!(value, Value::Undefined | Value::Function(_)) {
                        continue;
                    }
                    map.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Value::Circular => return Err(()),
        })
    }

    /// Decode a value from the tagged wire encoding
    ///
    /// Every value is a JSON array whose first element is a one-letter tag:
    /// `["u"]`, `["n"]`, `["b", bool]`, `["d", "<number text>"]`,
    /// `["s", string]`, `["a", [values]]`, `["o", [[key, value]]]`,
    /// `["f", text]` and `["c"]`.
    pub fn from_wire(wire: &serde_json::Value) -> Result<Value, WireError> {
        let parts = wire
            .as_array()
            .ok_or_else(|| WireError(format!("expected tagged array, got {wire}")))?;
        let tag = parts
            .first()
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| WireError("missing tag".to_string()))?;
        let payload = parts.get(1);

        match tag {
            "u" => Ok(Value::Undefined),
            "n" => Ok(Value::Null),
            "c" => Ok(Value::Circular),
            "b" => payload
                .and_then(serde_json::Value::as_bool)
                .map(Value::Bool)
                .ok_or_else(|| WireError("boolean payload".to_string())),
            "d" => {
                let text = payload_str(payload, "number")?;
                parse_number(text)
                    .map(Value::Number)
                    .ok_or_else(|| WireError(format!("invalid number '{text}'")))
            }
            "s" => Ok(Value::String(payload_str(payload, "string")?.to_string())),
            "f" => Ok(Value::Function(payload_str(payload, "function")?.to_string())),
            "a" => {
                let items = payload
                    .and_then(serde_json::Value::as_array)
                    .ok_or_else(|| WireError("array payload".to_string()))?;
                items
                    .iter()
                    .map(Value::from_wire)
                    .collect::<Result<_, _>>()
                    .map(Value::Array)
            }
            "o" => {
                let entries = payload
                    .and_then(serde_json::Value::as_array)
                    .ok_or_else(|| WireError("object payload".to_string()))?;
                let mut out = Vec::with_capacity(entries.len());
                for entry in entries {
                    let key = entry
                        .get(0)
                        .and_then(serde_json::Value::as_str)
                        .ok_or_else(|| WireError("object key".to_string()))?;
                    let value = entry
                        .get(1)
                        .ok_or_else(|| WireError(format!("missing value for key '{key}'")))?;
                    out.push((key.to_string(), Value::from_wire(value)?));
                }
                Ok(Value::Object(out))
            }
            other => Err(WireError(format!("unknown tag '{other}'"))),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

/// Structural equality used to grade results
///
/// Sequences compare in order, mappings compare by key set regardless of key
/// order. Numbers use IEEE equality, so `NaN` never equals itself. Any other
/// pairing of kinds is unequal.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| lookup(y, key).is_some_and(|other| deep_equal(value, other)))
        }
        _ => false,
    }
}

fn lookup<'a>(entries: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn payload_str<'a>(payload: Option<&'a serde_json::Value>, kind: &str) -> Result<&'a str, WireError> {
    payload
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| WireError(format!("{kind} payload")))
}

fn parse_number(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Render a number with JavaScript's number-to-string rules
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return n.to_string();
    }

    // Exponent form: JavaScript always signs the exponent
    let text = format!("{n:e}");
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => text,
    }
}
