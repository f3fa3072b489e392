//! Worded math to LaTeX-like notation.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::numbers::words_to_digits;

/// Phrase substitutions, applied in order. Longer phrases come first so that
/// "greater than or equal to" is not eaten by "greater than".
static SUBSTITUTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let rules: &[(&str, &str)] = &[
        (r"\s*\b(?:raised\s+)?to\s+the\s+power\s+of\b\s*", "^"),
        (r"\s*\braised\s+to\b\s*", "^"),
        (r"\s*\bgreater\s+than\s+or\s+equal\s+to\b\s*", r"\geq "),
        (r"\s*\bless\s+than\s+or\s+equal\s+to\b\s*", r"\leq "),
        (r"\s*\bnot\s+equal\s+to\b\s*", r"\neq "),
        (r"\s*\bis\s+equal\s+to\b\s*", "="),
        (r"\s*\bgreater\s+than\b\s*", ">"),
        (r"\s*\bless\s+than\b\s*", "<"),
        (r"\bsquare\s+root\s+of\b\s*", r"\sqrt{"),
        (r"\bcube\s+root\s+of\b\s*", r"\sqrt[3]{"),
        (r"\s*\bmultiplied\s+by\b\s*", r"\times "),
        (r"\s*\bdivided\s+by\b\s*", "/"),
        (r"\bderivative\s+of\b\s*", "d/dx "),
        (r"\bintegral\s+of\b\s*", r"\int "),
        (r"\s*\bsquared\b", "^2"),
        (r"\s*\bcubed\b", "^3"),
        (r"\s*\btimes\b\s*", r"\times "),
        (r"\s*\bplus\b\s*", "+"),
        (r"\s*\bminus\b\s*", "-"),
        (r"\s*\bequals\b\s*", "="),
        (r"\s*\bpercent\b", r"\%"),
        (r"\s*\bdegrees?\b", r"^\circ"),
        (r"\binfinity\b", r"\infty"),
        (r"\bpi\b", r"\pi"),
    ];
    rules
        .iter()
        .map(|(pattern, replacement)| {
            let re = Regex::new(&format!("(?i){pattern}"))
                .expect("Invalid regex: substitution rule");
            (re, *replacement)
        })
        .collect()
});

/// "a over b" between two operands.
static OVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\w)])\s+over\s+([\w(])").expect("Invalid regex: over")
});

/// Bare `a/b` where both sides are a number or a single letter.
static BARE_FRACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\\\w])(\d+(?:\.\d+)?|[A-Za-z])\s*/\s*(\d+(?:\.\d+)?|[A-Za-z])\b")
        .expect("Invalid regex: bare fraction")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace"));

/// Result of normalising a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalized {
    pub latex: String,
    /// Reserved for diagnostics; currently always empty.
    pub notes: Vec<String>,
}

/// Convert worded math into LaTeX-like notation.
///
/// Never fails: text it does not understand passes through unchanged.
pub fn normalize_to_latex(text: &str) -> Normalized {
    let mut out = words_to_digits(text);

    for (re, replacement) in SUBSTITUTIONS.iter() {
        out = re
            .replace_all(&out, regex::NoExpand(*replacement))
            .into_owned();
    }

    out = OVER.replace_all(&out, "${1}/${2}").into_owned();
    out = BARE_FRACTION
        .replace_all(&out, r"${1}\frac{${2}}{${3}}")
        .into_owned();
    out = WHITESPACE.replace_all(out.trim(), " ").into_owned();
    close_braces(&mut out);

    Normalized {
        latex: out,
        notes: Vec::new(),
    }
}

/// Append a `}` for every `{` left open, e.g. by "square root of".
fn close_braces(text: &mut String) {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    text.extend(std::iter::repeat('}').take(depth));
}
