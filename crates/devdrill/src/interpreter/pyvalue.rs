use std::fmt;

use super::expr::EvalError;

/// Longest string an operation may produce
const MAX_STRING_LEN: usize = 1 << 20;

/// A value of the Python subset
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

/// Numeric view of a value; booleans count as integers
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::Int(i) => i == 0,
            Num::Float(f) => f == 0.0,
        }
    }

    fn into_value(self) -> PyValue {
        match self {
            Num::Int(i) => PyValue::Int(i),
            Num::Float(f) => PyValue::Float(f),
        }
    }
}

impl PyValue {
    fn as_num(&self) -> Option<Num> {
        match self {
            PyValue::Int(i) => Some(Num::Int(*i)),
            PyValue::Bool(b) => Some(Num::Int(i64::from(*b))),
            PyValue::Float(f) => Some(Num::Float(*f)),
            PyValue::Str(_) | PyValue::None => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            PyValue::Int(_) => "int",
            PyValue::Float(_) => "float",
            PyValue::Str(_) => "str",
            PyValue::Bool(_) => "bool",
            PyValue::None => "NoneType",
        }
    }

    fn operands(&self, other: &PyValue, op: &str) -> Result<(Num, Num), EvalError> {
        match (self.as_num(), other.as_num()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(EvalError::Unsupported(format!(
                "unsupported operand types for {op}: '{}' and '{}'",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    pub(crate) fn add(&self, other: &PyValue) -> Result<PyValue, EvalError> {
        if let (PyValue::Str(a), PyValue::Str(b)) = (self, other) {
            check_len(a.len() + b.len())?;
            return Ok(PyValue::Str(format!("{a}{b}")));
        }
        let (a, b) = self.operands(other, "+")?;
        Ok(match (a, b) {
            (Num::Int(x), Num::Int(y)) => int_or_float(x.checked_add(y), x as f64 + y as f64),
            _ => PyValue::Float(a.as_f64() + b.as_f64()),
        })
    }

    pub(crate) fn sub(&self, other: &PyValue) -> Result<PyValue, EvalError> {
        let (a, b) = self.operands(other, "-")?;
        Ok(match (a, b) {
            (Num::Int(x), Num::Int(y)) => int_or_float(x.checked_sub(y), x as f64 - y as f64),
            _ => PyValue::Float(a.as_f64() - b.as_f64()),
        })
    }

    pub(crate) fn mul(&self, other: &PyValue) -> Result<PyValue, EvalError> {
        match (self, other) {
            (PyValue::Str(s), count) | (count, PyValue::Str(s))
                if matches!(count, PyValue::Int(_) | PyValue::Bool(_)) =>
            {
                let times = match count.as_num() {
                    Some(Num::Int(n)) => usize::try_from(n).unwrap_or(0),
                    _ => 0,
                };
                check_len(s.len().saturating_mul(times))?;
                Ok(PyValue::Str(s.repeat(times)))
            }
            _ => {
                let (a, b) = self.operands(other, "*")?;
                Ok(match (a, b) {
                    (Num::Int(x), Num::Int(y)) => {
                        int_or_float(x.checked_mul(y), x as f64 * y as f64)
                    }
                    _ => PyValue::Float(a.as_f64() * b.as_f64()),
                })
            }
        }
    }

    pub(crate) fn true_div(&self, other: &PyValue) -> Result<PyValue, EvalError> {
        let (a, b) = self.operands(other, "/")?;
        if b.is_zero() {
            return Err(EvalError::ZeroDivision("division by zero"));
        }
        Ok(PyValue::Float(a.as_f64() / b.as_f64()))
    }

    pub(crate) fn floor_div(&self, other: &PyValue) -> Result<PyValue, EvalError> {
        let (a, b) = self.operands(other, "//")?;
        match (a, b) {
            (Num::Int(_), Num::Int(0)) => Err(EvalError::ZeroDivision(
                "integer division or modulo by zero",
            )),
            (Num::Int(x), Num::Int(y)) => Ok(match x.checked_div(y) {
                Some(q) if x % y != 0 && ((x < 0) != (y < 0)) => PyValue::Int(q - 1),
                Some(q) => PyValue::Int(q),
                None => PyValue::Float((x as f64 / y as f64).floor()),
            }),
            _ if b.is_zero() => Err(EvalError::ZeroDivision("float floor division by zero")),
            _ => Ok(PyValue::Float((a.as_f64() / b.as_f64()).floor())),
        }
    }

    pub(crate) fn modulo(&self, other: &PyValue) -> Result<PyValue, EvalError> {
        let (a, b) = self.operands(other, "%")?;
        match (a, b) {
            (Num::Int(_), Num::Int(0)) => Err(EvalError::ZeroDivision("integer modulo by zero")),
            (Num::Int(x), Num::Int(y)) => {
                let r = x.checked_rem(y).unwrap_or(0);
                Ok(PyValue::Int(if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r }))
            }
            _ if b.is_zero() => Err(EvalError::ZeroDivision("float modulo")),
            _ => {
                let (x, y) = (a.as_f64(), b.as_f64());
                let r = x % y;
                Ok(PyValue::Float(if r != 0.0 && ((r < 0.0) != (y < 0.0)) { r + y } else { r }))
            }
        }
    }

    pub(crate) fn pow(&self, other: &PyValue) -> Result<PyValue, EvalError> {
        let (a, b) = self.operands(other, "**")?;
        if a.is_zero() && b.as_f64() < 0.0 {
            return Err(EvalError::ZeroDivision(
                "0.0 cannot be raised to a negative power",
            ));
        }

        if let (Num::Int(base), Num::Int(exp)) = (a, b)
            && exp >= 0
        {
            let exact = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e));
            return finite(int_or_float(exact, (base as f64).powf(exp as f64)));
        }

        let (base, exp) = (a.as_f64(), b.as_f64());
        if base < 0.0 && exp.fract() != 0.0 {
            return Err(EvalError::Unsupported(
                "complex result of fractional power".to_string(),
            ));
        }
        finite(PyValue::Float(base.powf(exp)))
    }

    pub(crate) fn neg(&self) -> Result<PyValue, EvalError> {
        match self.as_num() {
            Some(Num::Int(i)) => Ok(int_or_float(i.checked_neg(), -(i as f64))),
            Some(Num::Float(f)) => Ok(PyValue::Float(-f)),
            None => Err(EvalError::Unsupported(format!(
                "bad operand type for unary -: '{}'",
                self.type_name()
            ))),
        }
    }

    pub(crate) fn pos(&self) -> Result<PyValue, EvalError> {
        self.as_num().map(Num::into_value).ok_or_else(|| {
            EvalError::Unsupported(format!(
                "bad operand type for unary +: '{}'",
                self.type_name()
            ))
        })
    }
}

fn int_or_float(exact: Option<i64>, approx: f64) -> PyValue {
    exact.map_or(PyValue::Float(approx), PyValue::Int)
}

fn finite(value: PyValue) -> Result<PyValue, EvalError> {
    match value {
        PyValue::Float(f) if f.is_infinite() => {
            Err(EvalError::Unsupported("numerical result out of range".to_string()))
        }
        other => Ok(other),
    }
}

fn check_len(len: usize) -> Result<(), EvalError> {
    if len > MAX_STRING_LEN {
        return Err(EvalError::Unsupported("string result too large".to_string()));
    }
    Ok(())
}

/// Python `repr` of a float
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{f:e}");
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            None => sci,
        };
    }

    let text = f.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

impl fmt::Display for PyValue {
    /// Python `str()` of the value
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PyValue::Int(i) => write!(f, "{i}"),
            PyValue::Float(x) => write!(f, "{}", format_float(*x)),
            PyValue::Str(s) => write!(f, "{s}"),
            PyValue::Bool(true) => write!(f, "True"),
            PyValue::Bool(false) => write!(f, "False"),
            PyValue::None => write!(f, "None"),
        }
    }
}
