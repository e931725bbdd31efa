use std::sync::LazyLock;

use regex::Regex;

use super::scan::LineScanner;

static FUNCTION_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(")
        .expect("function declaration pattern is valid")
});

static FUNCTION_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)",
    )
    .expect("function binding pattern is valid")
});

const RESERVED_WORDS: [&str; 38] = [
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while",
];

/// Names of the top-level functions a source declares, in declaration order.
///
/// Recognizes `function NAME(`, `async function NAME(` and `const`/`let`/`var`
/// bindings initialized with a function or arrow expression. Declarations
/// nested inside other constructs are ignored.
pub fn declared_functions(source: &str) -> Vec<String> {
    let mut scanner = LineScanner::new();
    let mut names: Vec<String> = Vec::new();

    for line in source.lines() {
        let shape = scanner.scan(line);
        if shape.start_depth != 0 || shape.starts_inside_literal {
            continue;
        }

        let captured = FUNCTION_DECLARATION
            .captures(line)
            .or_else(|| FUNCTION_BINDING.captures(line));
        if let Some(caps) = captured {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    names
}

/// Whether `name` can be spliced into generated JavaScript as a bare identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return false;
    }
    !RESERVED_WORDS.contains(&name)
}
