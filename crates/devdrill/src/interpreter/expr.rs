//! Expression parser and evaluator for the Python subset
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/' | '//' | '%') factor)*
//! factor := ('+' | '-') factor | power
//! power  := atom ['**' factor]
//! atom   := INT | FLOAT | STRING | FSTRING | True | False | None | NAME | '(' expr ')'
//! ```

use std::collections::HashMap;

use super::lexer::{Token, tokenize};
use super::pyvalue::PyValue;

/// Deepest nesting of parentheses and unary operators accepted
const MAX_DEPTH: usize = 64;

/// Longest expression accepted, in tokens
const MAX_TOKENS: usize = 4096;

/// Why an expression produced no value
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EvalError {
    /// Outside the supported grammar; callers fall back to raw text
    Unsupported(String),
    /// A string literal without its closing quote
    UnterminatedString,
    ZeroDivision(&'static str),
}

impl EvalError {
    /// Whether the error aborts the whole program
    pub(crate) fn is_fatal(&self) -> bool {
        !matches!(self, EvalError::Unsupported(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(PyValue),
    FString(String),
    Name(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

/// Evaluate one expression against the variable table
pub(crate) fn evaluate(text: &str, vars: &HashMap<String, PyValue>) -> Result<PyValue, EvalError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(EvalError::Unsupported("empty expression".to_string()));
    }
    if tokens.len() > MAX_TOKENS {
        return Err(EvalError::Unsupported("expression too long".to_string()));
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(EvalError::Unsupported("unexpected trailing input".to_string()));
    }

    eval(&expr, vars)
}

/// Apply a binary operator named by its source text
pub(crate) fn apply_operator(
    op: &str,
    lhs: &PyValue,
    rhs: &PyValue,
) -> Result<PyValue, EvalError> {
    let op = match op {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "//" => BinOp::FloorDiv,
        "%" => BinOp::Mod,
        "**" => BinOp::Pow,
        other => return Err(EvalError::Unsupported(format!("operator '{other}'"))),
    };
    binary(op, lhs, rhs)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::Unsupported("expression nested too deeply".to_string()));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::DoubleSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn factor(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.pos += 1;
        self.descend()?;
        let operand = self.factor()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.pos += 1;
            self.descend()?;
            let exponent = self.factor()?;
            self.depth -= 1;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, EvalError> {
        let token = self
            .next()
            .cloned()
            .ok_or_else(|| EvalError::Unsupported("unexpected end of expression".to_string()))?;

        match token {
            Token::Int(i) => Ok(Expr::Literal(PyValue::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(PyValue::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(PyValue::Str(s))),
            Token::FStr(template) => Ok(Expr::FString(template)),
            Token::Name(name) => Ok(match name.as_str() {
                "True" => Expr::Literal(PyValue::Bool(true)),
                "False" => Expr::Literal(PyValue::Bool(false)),
                "None" => Expr::Literal(PyValue::None),
                _ => Expr::Name(name),
            }),
            Token::LParen => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(EvalError::Unsupported("expected ')'".to_string())),
                }
            }
            other => Err(EvalError::Unsupported(format!("unexpected token {other:?}"))),
        }
    }
}

fn eval(expr: &Expr, vars: &HashMap<String, PyValue>) -> Result<PyValue, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::FString(template) => render_fstring(template, vars).map(PyValue::Str),
        Expr::Name(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::Unsupported(format!("name '{name}' is not defined"))),
        Expr::Unary(op, operand) => {
            let value = eval(operand, vars)?;
            match op {
                UnaryOp::Neg => value.neg(),
                UnaryOp::Pos => value.pos(),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, vars)?;
            let rhs = eval(rhs, vars)?;
            binary(*op, &lhs, &rhs)
        }
    }
}

fn binary(op: BinOp, lhs: &PyValue, rhs: &PyValue) -> Result<PyValue, EvalError> {
    match op {
        BinOp::Add => lhs.add(rhs),
        BinOp::Sub => lhs.sub(rhs),
        BinOp::Mul => lhs.mul(rhs),
        BinOp::Div => lhs.true_div(rhs),
        BinOp::FloorDiv => lhs.floor_div(rhs),
        BinOp::Mod => lhs.modulo(rhs),
        BinOp::Pow => lhs.pow(rhs),
    }
}

/// Substitute `{expr}` fields of an f-string; `{{` and `}}` are literal braces
fn render_fstring(template: &str, vars: &HashMap<String, PyValue>) -> Result<String, EvalError> {
    let mut out = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(EvalError::Unsupported(
                                "malformed f-string field".to_string(),
                            ));
                        }
                        Some(other) => field.push(other),
                    }
                }
                if field.contains([':', '!']) {
                    return Err(EvalError::Unsupported(
                        "f-string format specifiers".to_string(),
                    ));
                }
                out.push_str(&evaluate(&field, vars)?.to_string());
            }
            '}' => {
                return Err(EvalError::Unsupported(
                    "single '}' in f-string".to_string(),
                ));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
