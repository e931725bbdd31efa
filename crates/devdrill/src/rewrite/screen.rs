use std::sync::LazyLock;

use regex::Regex;

use super::ScreenError;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern is valid")
}

static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)<!--.*?-->"));
static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?is)<script\b.*?</script\s*>"));
static JS_PROTOCOL: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)javascript:"));
static INLINE_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?i)\bon\w+\s*=\s*["'][^"']*["']"#));

static STRIPPED_CONSTRUCTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"\bimport\s+[^;\n]*?\bfrom\s*['"][^'"]*['"]"#,
        r#"\brequire\s*\(\s*['"][^'"]*['"]\s*\)"#,
        r"\bprocess\.",
        r"\bglobal\.",
        r"\bwindow\.",
        r"\bdocument\.",
        r"\beval\s*\(",
        r"\bFunction\s*\(",
        r"\bsetTimeout\b",
        r"\bsetInterval\b",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

/// Patterns that reject a submission outright, with the label reported back
static REJECTED_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("eval", r"\beval\s*\("),
        ("Function", r"\bFunction\s*\("),
        ("setTimeout", r"\bsetTimeout\s*\("),
        ("setInterval", r"\bsetInterval\s*\("),
        ("document", r"\bdocument\."),
        ("window", r"\bwindow\."),
        ("global", r"\bglobal\."),
        ("process", r"\bprocess\."),
        ("require", r"\brequire\s*\("),
        ("import", r"\bimport\s*\("),
        ("__proto__", r"__proto__"),
        ("constructor", r"\bconstructor\b"),
        ("prototype", r"\bprototype\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, compile(pattern)))
    .collect()
});

/// Remove markup that has no place in a code submission
pub fn sanitize_code(source: &str) -> String {
    let cleaned = HTML_COMMENT.replace_all(source, "");
    let cleaned = SCRIPT_BLOCK.replace_all(&cleaned, "");
    let cleaned = JS_PROTOCOL.replace_all(&cleaned, "");
    let cleaned = INLINE_HANDLER.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Delete module loading and host-object access from run-path code.
///
/// This is a textual first line of defense; the sandbox prelude shadows the
/// same names at runtime.
pub fn strip_dangerous(source: &str) -> String {
    STRIPPED_CONSTRUCTS
        .iter()
        .fold(source.to_string(), |code, pattern| {
            pattern.replace_all(&code, "").into_owned()
        })
}

/// Check a submission before it is graded
pub fn screen_submission(code: &str, max_length: usize) -> Result<(), ScreenError> {
    if code.trim().is_empty() {
        return Err(ScreenError::Empty);
    }

    let length = code.chars().count();
    if length > max_length {
        return Err(ScreenError::TooLong {
            max: max_length,
            actual: length,
        });
    }

    if let Some((label, _)) = REJECTED_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(code))
    {
        return Err(ScreenError::UnsafePattern(label));
    }

    Ok(())
}
