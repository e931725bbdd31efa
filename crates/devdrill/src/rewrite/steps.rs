//! Step-call instrumentation
//!
//! Inserts a call at the top of every loop body and function body so the
//! host can count work and stop a script that has been abandoned. Blocks
//! are recognized by what precedes the opening brace: a closing parenthesis
//! (other than a `switch` head), an arrow, or one of `do`, `else`, `try`,
//! `finally`. Brace-less loop bodies are not instrumented.

/// Name of the host function the inserted calls invoke
pub const STEP_FUNCTION: &str = "__step";

const BLOCK_KEYWORDS: [&str; 4] = ["do", "else", "try", "finally"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    SingleQuote,
    DoubleQuote,
    Template,
    LineComment,
    BlockComment,
}

/// Insert `__step();` after the opening brace of each statement block
pub fn insert_step_calls(source: &str) -> String {
    let call = format!("{STEP_FUNCTION}();");
    let mut out = String::with_capacity(source.len() + source.len() / 8);
    let mut mode = Mode::Code;
    let mut escaped = false;
    // Word preceding each open parenthesis, so `switch (x) {` can be told apart
    let mut paren_heads: Vec<Option<String>> = Vec::new();
    let mut closed_head: Option<String> = None;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match mode {
            Mode::Code => match c {
                '\'' => mode = Mode::SingleQuote,
                '"' => mode = Mode::DoubleQuote,
                '`' => mode = Mode::Template,
                '/' if chars.peek() == Some(&'/') => mode = Mode::LineComment,
                '/' if chars.peek() == Some(&'*') => mode = Mode::BlockComment,
                '(' => paren_heads.push(trailing_word(&out).map(str::to_string)),
                ')' => closed_head = paren_heads.pop().flatten(),
                '{' => {
                    let opens_block = opens_statement_block(&out, closed_head.as_deref());
                    out.push(c);
                    if opens_block {
                        out.push_str(&call);
                    }
                    continue;
                }
                _ => {}
            },
            Mode::SingleQuote | Mode::DoubleQuote | Mode::Template => {
                let quote = match mode {
                    Mode::SingleQuote => '\'',
                    Mode::DoubleQuote => '"',
                    _ => '`',
                };
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote || (c == '\n' && mode != Mode::Template) {
                    mode = Mode::Code;
                }
            }
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    out.push(c);
                    if let Some(slash) = chars.next() {
                        out.push(slash);
                    }
                    mode = Mode::Code;
                    continue;
                }
            }
        }
        out.push(c);
    }

    out
}

fn opens_statement_block(before: &str, closed_head: Option<&str>) -> bool {
    let before = before.trim_end();
    if before.ends_with(')') {
        return closed_head != Some("switch");
    }
    if before.ends_with("=>") {
        return true;
    }
    trailing_word(before).is_some_and(|word| BLOCK_KEYWORDS.contains(&word))
}

/// Identifier immediately before the end of `text`, ignoring whitespace
fn trailing_word(text: &str) -> Option<&str> {
    let text = text.trim_end();
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '$')
        .last()
        .map(|(i, _)| i)?;
    Some(&text[start..])
}
