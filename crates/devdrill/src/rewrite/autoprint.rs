use super::scan::{LineScanner, LineShape};

/// Substrings that mark a line as a statement rather than a printable expression
const STATEMENT_MARKERS: [&str; 10] = [
    "function ",
    "const ",
    "let ",
    "var ",
    "if ",
    "for ",
    "while ",
    "class ",
    "console.",
    "return ",
];

/// Leading tokens of a line that continues or closes an earlier construct
const CONTINUATION_PREFIXES: [&str; 9] = ["}", ")", "]", ".", "?", ":", "&&", "||", ","];

/// Leading keywords that can never stand inside parentheses
const KEYWORD_PREFIXES: [&str; 16] = [
    "else", "case ", "default", "try", "catch", "finally", "do", "switch", "throw ", "break",
    "continue", "import ", "export ", "async ", "yield", "await ",
];

/// Trailing tokens that leave an expression unfinished
const OPEN_SUFFIXES: [&str; 11] = ["(", "[", ",", "=>", "+", "-", "*", "/", "=", "&&", "||"];

/// Wrap every stand-alone top-level expression line so its value is printed.
///
/// Lines recognized as statements, lines nested inside a bracketed construct
/// and lines that continue a multi-line expression are passed through
/// unchanged. The output is only a rewrite; nothing here executes code.
pub fn instrument_auto_print(source: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let mut scanner = LineScanner::new();
    let mut out = Vec::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        let shape = scanner.scan(line);
        let next = lines[index + 1..]
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty());

        if is_printable_expression(line, &shape, next) {
            out.push(wrap_expression(line.trim()));
        } else {
            out.push((*line).to_string());
        }
    }

    out.join("\n")
}

fn is_printable_expression(line: &str, shape: &LineShape, next: Option<&str>) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with("/*") {
        return false;
    }
    if !shape.is_top_level_balanced() {
        return false;
    }
    if is_statement(trimmed) {
        return false;
    }
    // The next line continues this expression, e.g. a chained `.map(...)`
    if let Some(next) = next
        && CONTINUATION_PREFIXES
            .iter()
            .any(|prefix| next.starts_with(prefix) && !next.starts_with("}"))
    {
        return false;
    }
    true
}

/// Whether a trimmed line reads as a statement
fn is_statement(trimmed: &str) -> bool {
    if STATEMENT_MARKERS.iter().any(|marker| trimmed.contains(marker)) {
        return true;
    }
    if trimmed.ends_with('{') || trimmed.ends_with(';') {
        return true;
    }
    if CONTINUATION_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
    {
        return true;
    }
    if KEYWORD_PREFIXES
        .iter()
        .any(|keyword| starts_with_word(trimmed, keyword))
    {
        return true;
    }
    let code = strip_trailing_comment(trimmed);
    OPEN_SUFFIXES.iter().any(|suffix| code.ends_with(suffix))
}

fn starts_with_word(line: &str, keyword: &str) -> bool {
    if !line.starts_with(keyword) {
        return false;
    }
    if keyword.ends_with(' ') {
        return true;
    }
    line[keyword.len()..]
        .chars()
        .next()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '$'))
}

fn strip_trailing_comment(line: &str) -> &str {
    match line.rfind("//") {
        // Only strip when the marker is outside any quote on the line
        Some(pos) if !line[..pos].contains(['"', '\'', '`']) => line[..pos].trim_end(),
        _ => line,
    }
}

/// Rewrite one expression line into a guarded print.
///
/// When evaluating the expression throws, the line is re-run as a plain
/// statement so its own error surfaces.
fn wrap_expression(line: &str) -> String {
    format!(
        "try {{ var __expr_result = (\n{line}\n); if (__expr_result !== undefined) console.log(__expr_result); }} catch (__expr_error) {{\n{line}\n}}"
    )
}
