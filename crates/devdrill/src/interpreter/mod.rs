//! Line interpreter for a small Python subset
//!
//! Backs the run path for Python submissions. Supported lines:
//!
//! ```text
//! program := line*
//! line    := blank | comment | print | assign | block | expr
//! comment := '#' ...
//! print   := 'print' '(' [ arg (',' arg)* ] ')'
//! arg     := expr | ('sep' | 'end') '=' expr
//! assign  := NAME ('=' | '+=' | '-=' | '*=' | '/=') expr
//! block   := 'def' ... | any line ending in ':'   (skipped with its indented body)
//! ```
//!
//! Expressions follow the grammar in [`expr`]. A print argument outside the
//! grammar is echoed as written with known variables substituted, an
//! assignment outside it stores the raw text, and a bare expression outside
//! it is ignored. Unterminated strings and division by zero stop the program.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;
use tracing::debug;

pub use crate::interpreter::pyvalue::PyValue;
use crate::interpreter::expr::{EvalError, apply_operator, evaluate};

mod expr;
mod lexer;
mod pyvalue;

/// Output rendered when a program prints nothing
pub const NO_OUTPUT_MESSAGE: &str = "Python code executed successfully (no output)";

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*(\+=|-=|\*=|/=|=)(.*)$")
        .expect("assignment pattern is valid")
});

static KEYWORD_ARGUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(sep|end)\s*=([^=].*)$").expect("keyword argument pattern is valid")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid"));

/// Errors that stop a program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("unterminated string literal (line {line})")]
    UnterminatedString { line: usize },

    #[error("ZeroDivisionError: {message} (line {line})")]
    ZeroDivision { line: usize, message: String },
}

impl InterpretError {
    fn at_line(error: EvalError, line: usize) -> Option<Self> {
        match error {
            EvalError::UnterminatedString => Some(InterpretError::UnterminatedString { line }),
            EvalError::ZeroDivision(message) => Some(InterpretError::ZeroDivision {
                line,
                message: message.to_string(),
            }),
            EvalError::Unsupported(_) => None,
        }
    }
}

/// Run a program and render its output
pub fn run_python(source: &str) -> Result<String, InterpretError> {
    let mut interpreter = Interpreter::new();
    interpreter.run(source)?;
    Ok(interpreter.render())
}

/// Interpreter state: the variable table and the text printed so far
#[derive(Debug, Default)]
pub struct Interpreter {
    variables: HashMap<String, PyValue>,
    stdout: String,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable
    pub fn variable(&self, name: &str) -> Option<&PyValue> {
        self.variables.get(name)
    }

    /// Text printed so far
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Output as shown to the user
    pub fn render(&self) -> String {
        if self.stdout.is_empty() {
            return NO_OUTPUT_MESSAGE.to_string();
        }
        self.stdout
            .strip_suffix('\n')
            .unwrap_or(&self.stdout)
            .to_string()
    }

    /// Execute every line of `source`
    pub fn run(&mut self, source: &str) -> Result<(), InterpretError> {
        let mut skipped_block: Option<usize> = None;

        for (index, raw) in source.lines().enumerate() {
            let line_number = index + 1;
            let code = strip_comment(raw);
            let trimmed = code.trim();
            if trimmed.is_empty() {
                continue;
            }

            let indent = raw.len() - raw.trim_start().len();
            if let Some(header_indent) = skipped_block {
                if indent > header_indent {
                    continue;
                }
                skipped_block = None;
            }

            if trimmed.starts_with("def ") || trimmed.ends_with(':') {
                debug!(line = line_number, "skipping block");
                skipped_block = Some(indent);
                continue;
            }

            if let Err(error) = self.execute_line(trimmed)
                && let Some(fatal) = InterpretError::at_line(error, line_number)
            {
                return Err(fatal);
            }
        }

        Ok(())
    }

    fn execute_line(&mut self, line: &str) -> Result<(), EvalError> {
        if let Some(arguments) = print_arguments(line) {
            return self.print(arguments);
        }

        if let Some(caps) = ASSIGNMENT.captures(line)
            && !caps[3].starts_with('=')
        {
            return self.assign(&caps[1], &caps[2], caps[3].trim());
        }

        match evaluate(line, &self.variables) {
            Ok(PyValue::None) => Ok(()),
            Ok(value) => {
                self.stdout.push_str(&value.to_string());
                self.stdout.push('\n');
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!(?e, line, "ignoring unsupported expression");
                Ok(())
            }
        }
    }

    fn print(&mut self, arguments: &str) -> Result<(), EvalError> {
        let mut parts = Vec::new();
        let mut sep = " ".to_string();
        let mut end = "\n".to_string();

        for argument in split_arguments(arguments) {
            if let Some(caps) = KEYWORD_ARGUMENT.captures(&argument) {
                let text = self.render_argument(caps[2].trim())?;
                if &caps[1] == "sep" {
                    sep = text;
                } else {
                    end = text;
                }
                continue;
            }
            parts.push(self.render_argument(&argument)?);
        }

        self.stdout.push_str(&parts.join(&sep));
        self.stdout.push_str(&end);
        Ok(())
    }

    /// Value of a print argument, or its text with known variables filled in
    fn render_argument(&self, argument: &str) -> Result<String, EvalError> {
        match evaluate(argument, &self.variables) {
            Ok(value) => Ok(value.to_string()),
            Err(e) if e.is_fatal() => Err(e),
            Err(_) => Ok(self.substitute_variables(argument)),
        }
    }

    fn substitute_variables(&self, text: &str) -> String {
        IDENTIFIER
            .replace_all(text, |caps: &Captures| match self.variables.get(&caps[0]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    fn assign(&mut self, name: &str, op: &str, rhs: &str) -> Result<(), EvalError> {
        let value = match evaluate(rhs, &self.variables) {
            Ok(value) => value,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => PyValue::Str(rhs.to_string()),
        };

        let value = match op.strip_suffix('=').filter(|op| !op.is_empty()) {
            None => value,
            Some(operator) => {
                let Some(current) = self.variables.get(name) else {
                    debug!(name, "augmented assignment to undefined variable");
                    return Ok(());
                };
                match apply_operator(operator, current, &value) {
                    Ok(updated) => updated,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        debug!(?e, name, "augmented assignment left variable unchanged");
                        return Ok(());
                    }
                }
            }
        };

        self.variables.insert(name.to_string(), value);
        Ok(())
    }
}

/// Arguments of a `print(...)` call spanning the whole line
fn print_arguments(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("print")?.trim_start();
    let inner_start = line.len() - rest.len() + 1;
    if !rest.starts_with('(') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in rest.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    // The call must close at the end of the line
                    return (offset == rest.len() - 1)
                        .then(|| &line[inner_start..line.len() - 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split call arguments on top-level commas
fn split_arguments(arguments: &str) -> Vec<String> {
    if arguments.trim().is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in arguments.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

/// Drop a trailing `#` comment that is outside string literals
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '#' => return &line[..offset],
            _ => {}
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> String {
        run_python(source).unwrap()
    }

    #[test]
    fn print_literals() {
        assert_eq!(run("print(\"Hello, World!\")"), "Hello, World!");
        assert_eq!(run("print('single')"), "single");
        assert_eq!(run("print(42)"), "42");
    }

    #[test]
    fn print_arithmetic_and_variables() {
        let source = "x = 5\ny = x * 2\nprint(x + y)\nprint(7 / 2)\nprint(7 // 2)";
        assert_eq!(run(source), "15\n3.5\n3");
    }

    #[test]
    fn print_multiple_arguments() {
        let source = "name = 'Ada'\nprint('Hello', name, 1 + 1)";
        assert_eq!(run(source), "Hello Ada 2");
    }

    #[test]
    fn print_keyword_arguments() {
        let source = "print('a', 'b', sep='-')\nprint('x', end='')\nprint('y')";
        assert_eq!(run(source), "a-b\nxy");
    }

    #[test]
    fn empty_print_is_blank_line() {
        assert_eq!(run("print()\nprint('after')"), "\nafter");
    }

    #[test]
    fn unsupported_argument_is_echoed_with_substitution() {
        let source = "items = 3\nprint(len(items))";
        assert_eq!(run(source), "len(3)");
    }

    #[test]
    fn assignment_stores_raw_text_when_unsupported() {
        let mut interpreter = Interpreter::new();
        interpreter.run("data = [1, 2, 3]").unwrap();
        assert_eq!(
            interpreter.variable("data"),
            Some(&PyValue::Str("[1, 2, 3]".into()))
        );
    }

    #[test]
    fn augmented_assignment() {
        let mut interpreter = Interpreter::new();
        interpreter
            .run("total = 10\ntotal += 5\ntotal -= 1\ntotal *= 2\ntotal /= 4")
            .unwrap();
        assert_eq!(interpreter.variable("total"), Some(&PyValue::Float(7.0)));

        interpreter.run("missing += 1").unwrap();
        assert_eq!(interpreter.variable("missing"), None);
    }

    #[test]
    fn comparison_is_not_assignment() {
        let mut interpreter = Interpreter::new();
        interpreter.run("x = 1\nx == 2").unwrap();
        assert_eq!(interpreter.variable("x"), Some(&PyValue::Int(1)));
        assert_eq!(interpreter.render(), NO_OUTPUT_MESSAGE);
    }

    #[test]
    fn bare_expressions() {
        assert_eq!(run("2 ** 10\nunknown_name\nNone"), "1024");
    }

    #[test]
    fn blocks_are_skipped() {
        let source = "def greet(name):\n    print('hi', name)\n\n    return name\nprint('done')\nif True:\n    print('inside')\nprint('end')";
        assert_eq!(run(source), "done\nend");
    }

    #[test]
    fn comments_are_ignored() {
        let source = "# heading\nx = 3  # three\nprint(x)  # show\nprint('# not a comment')";
        assert_eq!(run(source), "3\n# not a comment");
    }

    #[test]
    fn no_output_message() {
        assert_eq!(run("x = 1"), NO_OUTPUT_MESSAGE);
        assert_eq!(run(""), NO_OUTPUT_MESSAGE);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(
            run_python("print('ok')\nprint(\"oops)"),
            Err(InterpretError::UnterminatedString { line: 2 })
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let error = run_python("x = 0\nprint(1 / x)").unwrap_err();
        assert_eq!(
            error,
            InterpretError::ZeroDivision {
                line: 2,
                message: "division by zero".to_string()
            }
        );
        assert_eq!(error.to_string(), "ZeroDivisionError: division by zero (line 2)");
    }

    #[test]
    fn print_must_span_the_line() {
        assert_eq!(print_arguments("print('a')"), Some("'a'"));
        assert_eq!(print_arguments("print ('a')"), Some("'a'"));
        assert_eq!(print_arguments("print('a') + print('b')"), None);
        assert_eq!(print_arguments("printer('a')"), None);
        assert_eq!(print_arguments("print(')')"), Some("')'"));
    }

    #[test]
    fn argument_splitting_respects_quotes_and_brackets() {
        assert_eq!(
            split_arguments("'a, b', f(1, 2), [3, 4]"),
            vec!["'a, b'", "f(1, 2)", "[3, 4]"]
        );
        assert!(split_arguments("  ").is_empty());
    }
}
