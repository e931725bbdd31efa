//! Bracket-depth scanner for JavaScript source lines
//!
//! Tracks nesting of `()`, `[]` and `{}` across lines while skipping string
//! literals, template literals and comments. Regular expression literals are
//! not recognized.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Code,
    SingleQuote,
    DoubleQuote,
    Template,
    BlockComment,
}

/// Scanner state carried from one line to the next
#[derive(Debug, Clone, Default)]
pub struct LineScanner {
    depth: i64,
    mode: Mode,
}

/// What a single line did to the nesting state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineShape {
    /// Depth before the line
    pub start_depth: i64,
    /// Lowest depth reached within the line, relative to `start_depth`
    pub min_delta: i64,
    /// Depth after the line, relative to `start_depth`
    pub end_delta: i64,
    /// Whether the line started inside a multi-line literal or comment
    pub starts_inside_literal: bool,
    /// Whether the line ended inside a multi-line literal or comment
    pub ends_inside_literal: bool,
}

impl LineShape {
    /// A line that stands alone at the top level
    pub fn is_top_level_balanced(&self) -> bool {
        self.start_depth == 0
            && self.min_delta == 0
            && self.end_delta == 0
            && !self.starts_inside_literal
            && !self.ends_inside_literal
    }
}

impl LineScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line and report its shape
    pub fn scan(&mut self, line: &str) -> LineShape {
        let start_depth = self.depth;
        let starts_inside_literal = self.mode != Mode::Code;
        let mut min_depth = self.depth;

        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match self.mode {
                Mode::Code => match c {
                    '\'' => self.mode = Mode::SingleQuote,
                    '"' => self.mode = Mode::DoubleQuote,
                    '`' => self.mode = Mode::Template,
                    '/' if chars.peek() == Some(&'/') => break,
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        self.mode = Mode::BlockComment;
                    }
                    '(' | '[' | '{' => self.depth += 1,
                    ')' | ']' | '}' => {
                        self.depth -= 1;
                        min_depth = min_depth.min(self.depth);
                    }
                    _ => {}
                },
                Mode::SingleQuote | Mode::DoubleQuote => {
                    let quote = if self.mode == Mode::SingleQuote { '\'' } else { '"' };
                    if c == '\\' {
                        chars.next();
                    } else if c == quote {
                        self.mode = Mode::Code;
                    }
                }
                Mode::Template => {
                    if c == '\\' {
                        chars.next();
                    } else if c == '`' {
                        self.mode = Mode::Code;
                    }
                }
                Mode::BlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        self.mode = Mode::Code;
                    }
                }
            }
        }

        // Unterminated quotes do not continue onto the next line
        if matches!(self.mode, Mode::SingleQuote | Mode::DoubleQuote) {
            self.mode = Mode::Code;
        }

        LineShape {
            start_depth,
            min_delta: min_depth - start_depth,
            end_delta: self.depth - start_depth,
            starts_inside_literal,
            ends_inside_literal: self.mode != Mode::Code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_line() {
        let mut scanner = LineScanner::new();
        let shape = scanner.scan("add(1, [2, 3])");
        assert!(shape.is_top_level_balanced());
    }

    #[test]
    fn tracks_depth_across_lines() {
        let mut scanner = LineScanner::new();
        let open = scanner.scan("function f() {");
        assert_eq!(open.end_delta, 1);

        let body = scanner.scan("  x + 1");
        assert_eq!(body.start_depth, 1);
        assert!(!body.is_top_level_balanced());

        let close = scanner.scan("}");
        assert_eq!(close.min_delta, -1);
        assert_eq!(scanner.scan("2 + 2").start_depth, 0);
    }

    #[test]
    fn ignores_brackets_in_strings_and_comments() {
        let mut scanner = LineScanner::new();
        assert!(scanner.scan(r#"console.log("(", ')')"#).is_top_level_balanced());
        assert!(scanner.scan("x // {").is_top_level_balanced());
        assert!(scanner.scan("y /* [ */").is_top_level_balanced());
        assert!(scanner.scan(r#""a\"(""#).is_top_level_balanced());
    }

    #[test]
    fn template_literal_spans_lines() {
        let mut scanner = LineScanner::new();
        let first = scanner.scan("const s = `line {");
        assert!(first.ends_inside_literal);
        assert_eq!(first.end_delta, 0);

        let second = scanner.scan("} more`");
        assert!(second.starts_inside_literal);
        assert!(!second.ends_inside_literal);
        assert_eq!(second.end_delta, 0);
    }

    #[test]
    fn block_comment_spans_lines() {
        let mut scanner = LineScanner::new();
        assert!(scanner.scan("/* start (").ends_inside_literal);
        let end = scanner.scan("end */ 1 + 1");
        assert!(end.starts_inside_literal);
        assert_eq!(end.end_delta, 0);
    }
}
