//! Prompt validation and sanitization applied before submission.

use std::sync::LazyLock;

use regex::Regex;

/// Minimum prompt length after trimming.
pub const MIN_PROMPT_LEN: usize = 10;
/// Maximum prompt length (untrimmed).
pub const MAX_PROMPT_LEN: usize = 2000;

static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)violence|gore|blood",
        r"(?i)nsfw|adult|explicit",
        r"(?i)hate|discrimination",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Check a raw prompt, collecting every problem found.
///
/// Returns the list of human-readable problems; empty means valid.
pub fn prompt_problems(prompt: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if prompt.trim().chars().count() < MIN_PROMPT_LEN {
        problems.push(format!(
            "Prompt must be at least {MIN_PROMPT_LEN} characters long"
        ));
    }
    if prompt.chars().count() > MAX_PROMPT_LEN {
        problems.push(format!(
            "Prompt must be less than {MAX_PROMPT_LEN} characters"
        ));
    }
    if BLOCKED_PATTERNS.iter().any(|re| re.is_match(prompt)) {
        problems.push("Prompt contains inappropriate content".to_string());
    }

    problems
}

/// Trim and HTML-escape a prompt.
pub fn sanitize_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}
