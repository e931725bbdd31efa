//! Tokenizer for single-line expressions of the Python subset

use super::expr::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    /// Raw template of an f-string, braces unresolved
    FStr(String),
    Name(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    LParen,
    RParen,
    Comma,
}

pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '0'..='9' => pos = lex_number(&chars, pos, &mut tokens)?,
            '.' if chars.get(pos + 1).is_some_and(char::is_ascii_digit) => {
                pos = lex_number(&chars, pos, &mut tokens)?
            }
            '"' | '\'' => {
                let (literal, next) = lex_string(&chars, pos, false)?;
                tokens.push(Token::Str(literal));
                pos = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                let name: String = chars[start..pos].iter().collect();

                match (name.as_str(), chars.get(pos)) {
                    ("f" | "F", Some('"' | '\'')) => {
                        let (template, next) = lex_string(&chars, pos, false)?;
                        tokens.push(Token::FStr(template));
                        pos = next;
                    }
                    ("r" | "R", Some('"' | '\'')) => {
                        let (literal, next) = lex_string(&chars, pos, true)?;
                        tokens.push(Token::Str(literal));
                        pos = next;
                    }
                    (_, Some('"' | '\'')) => {
                        return Err(EvalError::Unsupported(format!(
                            "string prefix '{name}'"
                        )));
                    }
                    _ => tokens.push(Token::Name(name)),
                }
            }
            '*' if chars.get(pos + 1) == Some(&'*') => {
                tokens.push(Token::DoubleStar);
                pos += 2;
            }
            '/' if chars.get(pos + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                pos += 2;
            }
            '+' | '-' | '*' | '/' | '%' | '(' | ')' | ',' => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
                pos += 1;
            }
            other => {
                return Err(EvalError::Unsupported(format!(
                    "unexpected character '{other}'"
                )));
            }
        }
    }

    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize, tokens: &mut Vec<Token>) -> Result<usize, EvalError> {
    let mut pos = start;
    let mut is_float = false;

    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    if chars.get(pos) == Some(&'.') {
        is_float = true;
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if matches!(chars.get(pos), Some('e' | 'E')) {
        let mut exp = pos + 1;
        if matches!(chars.get(exp), Some('+' | '-')) {
            exp += 1;
        }
        if chars.get(exp).is_some_and(char::is_ascii_digit) {
            is_float = true;
            pos = exp;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    if chars
        .get(pos)
        .is_some_and(|c| c.is_alphanumeric() || *c == '_')
    {
        return Err(EvalError::Unsupported("malformed number".to_string()));
    }

    let text: String = chars[start..pos].iter().collect();
    let token = if is_float {
        text.parse()
            .map(Token::Float)
            .map_err(|_| EvalError::Unsupported(format!("number '{text}'")))?
    } else {
        text.parse()
            .map(Token::Int)
            .map_err(|_| EvalError::Unsupported(format!("integer '{text}' out of range")))?
    };
    tokens.push(token);
    Ok(pos)
}

/// Lex a quoted literal starting at `start`; returns the contents and the
/// position after the closing quote
fn lex_string(chars: &[char], start: usize, raw: bool) -> Result<(String, usize), EvalError> {
    let quote = chars[start];
    if chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote) {
        return Err(EvalError::Unsupported("triple-quoted string".to_string()));
    }

    let mut literal = String::new();
    let mut pos = start + 1;
    while pos < chars.len() {
        let c = chars[pos];
        if c == quote {
            return Ok((literal, pos + 1));
        }
        if c == '\\' && pos + 1 < chars.len() {
            let escaped = chars[pos + 1];
            if raw {
                literal.push('\\');
                literal.push(escaped);
            } else {
                match escaped {
                    'n' => literal.push('\n'),
                    't' => literal.push('\t'),
                    '\\' => literal.push('\\'),
                    '\'' => literal.push('\''),
                    '"' => literal.push('"'),
                    other => {
                        literal.push('\\');
                        literal.push(other);
                    }
                }
            }
            pos += 2;
            continue;
        }
        literal.push(c);
        pos += 1;
    }

    Err(EvalError::UnterminatedString)
}
