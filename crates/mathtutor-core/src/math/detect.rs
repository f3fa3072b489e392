//! Heuristic "is this math?" classification of free text.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::numbers;

/// Symbol characters and operator/operand patterns.
static SYMBOL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"[√π∑∫≤≥≠×÷∞]").expect("Invalid regex: math symbols"),
        Regex::new(r"\d\s*[-+*/^=<>%]\s*[\d(a-zA-Z]").expect("Invalid regex: digit operator"),
        Regex::new(r"[a-zA-Z)]\s*[\^=]\s*-?[\d(a-zA-Z]").expect("Invalid regex: variable operator"),
        Regex::new(r"[a-zA-Z\d)]\s*[+*<>]\s*[a-zA-Z\d(]").expect("Invalid regex: letter operator"),
        // `-` and `/` only after a lone variable, so "e-mail" and "and/or" stay prose
        Regex::new(r"\b[a-zA-Z]\s*[-/]\s*(?:[a-zA-Z]\b|[\d(])")
            .expect("Invalid regex: variable minus or slash"),
        Regex::new(
            r"\\(?:frac|sqrt|int|sum|prod|lim|pi|theta|alpha|beta|times|div|cdot|infty|leq|geq|neq|log|ln|sin|cos|tan)\b",
        )
        .expect("Invalid regex: LaTeX macros"),
    ]
});

/// Curated phrasings of math questions.
static WORDY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\bsolve\s+for\b").expect("Invalid regex: solve for"),
        Regex::new(
            r"(?i)\bwhat(?:'s|\s+is)\s+(?:-?\d|the\s+(?:sum|product|difference|quotient|value|square|area|perimeter|volume|derivative|integral)\b)",
        )
        .expect("Invalid regex: what is"),
        Regex::new(r"(?i)\b(?:evaluate|simplify|factori[sz]e|differentiate|integrate)\b")
            .expect("Invalid regex: imperative verbs"),
        Regex::new(r"(?i)\b(?:derivative|integral)\s+of\b").expect("Invalid regex: calculus"),
        Regex::new(r"(?i)\blimit\s+as\b").expect("Invalid regex: limit as"),
        Regex::new(
            r"(?i)\b(?:area|perimeter|volume|circumference|hypotenuse)\s+of\b|\bsurface\s+area\b|\bhow\s+many\s+degrees\b",
        )
        .expect("Invalid regex: geometry"),
        Regex::new(
            r"(?i)\bstandard\s+deviation\b|\b(?:mean|median|mode|probability|variance)\s+of\b",
        )
        .expect("Invalid regex: statistics"),
    ]
});

static WHAT_IS_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bwhat(?:'s|\s+is)\s+([a-z]+)").expect("Invalid regex: what is word")
});

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:=|calc:)").expect("Invalid regex: marker"));

static DOLLAR_WRAPPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\$[^$]+\$\s*$").expect("Invalid regex: dollar math"));

static WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}+").expect("Invalid regex: unicode words"));

const OPERATION_WORDS: &[&str] = &[
    "plus",
    "minus",
    "times",
    "multiplied",
    "multiply",
    "divided",
    "divide",
    "over",
    "squared",
    "cubed",
    "root",
    "percent",
    "equals",
    "sum",
    "difference",
    "product",
    "quotient",
    "add",
    "subtract",
    "half",
];

/// Unambiguous math vocabulary, matched with typo tolerance.
const KEYWORDS: &[&str] = &[
    // arithmetic
    "addition",
    "subtraction",
    "multiplication",
    "division",
    "fraction",
    "decimal",
    "percentage",
    "remainder",
    "numerator",
    "denominator",
    // algebra
    "algebra",
    "equation",
    "inequality",
    "polynomial",
    "quadratic",
    "exponent",
    "logarithm",
    "coefficient",
    "variable",
    "matrix",
    // calculus
    "calculus",
    "derivative",
    "integral",
    "differentiate",
    "asymptote",
    // geometry
    "geometry",
    "triangle",
    "rectangle",
    "parallelogram",
    "trapezoid",
    "hypotenuse",
    "perimeter",
    "circumference",
    "diameter",
    "radius",
    "perpendicular",
    "pythagoras",
    "theorem",
    // statistics
    "statistics",
    "probability",
    "variance",
    "median",
    "histogram",
    // french
    "équation",
    "dérivée",
    "intégrale",
    "géométrie",
    "soustraction",
    "pourcentage",
    "probabilité",
];

/// Everyday words with a math sense. Exact match only, never strong alone.
const WEAK_KEYWORDS: &[&str] = &[
    "square", "circle", "angle", "area", "volume", "slope", "limit", "factor", "linear",
    "mean", "average", "total", "prime", "graph", "cosine", "sine", "tangent", "vector",
    "moyenne", "calcul",
];

/// Keywords shorter than this are not fuzzy-matched.
const FUZZY_MIN_CHARS: usize = 6;

/// Tunables for the detector, loadable from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Max distance score (0 = identical) for a keyword hit.
    #[serde(default = "default_keyword_threshold")]
    pub keyword_threshold: f64,
    /// Max distance score for a hit that accepts on its own.
    #[serde(default = "default_strong_threshold")]
    pub strong_threshold: f64,
    /// Extra keywords treated like the built-in math vocabulary.
    #[serde(default)]
    pub extra_keywords: Vec<String>,
}

fn default_keyword_threshold() -> f64 {
    0.35
}

fn default_strong_threshold() -> f64 {
    0.2
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            keyword_threshold: default_keyword_threshold(),
            strong_threshold: default_strong_threshold(),
            extra_keywords: Vec::new(),
        }
    }
}

/// Why a text was classified as math.
#[derive(Debug, Clone, PartialEq)]
pub enum MathSignal {
    /// Leading `=` or `calc:`.
    Marker,
    /// Wrapped in `$...$`.
    DollarDelimited,
    /// Math symbols, operators between operands, or LaTeX macros.
    Symbol,
    /// A curated question phrasing such as "solve for".
    WordyPattern,
    /// A number together with an operation word.
    NumberWithOperation,
    /// Fuzzy keyword hits; `score` is the best distance score seen.
    Keyword { keyword: String, score: f64 },
}

impl fmt::Display for MathSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathSignal::Marker => write!(f, "calculator marker"),
            MathSignal::DollarDelimited => write!(f, "dollar-delimited math"),
            MathSignal::Symbol => write!(f, "math symbols"),
            MathSignal::WordyPattern => write!(f, "math phrasing"),
            MathSignal::NumberWithOperation => write!(f, "number with operation word"),
            MathSignal::Keyword { keyword, score } => {
                write!(f, "keyword '{keyword}' (distance {score:.2})")
            }
        }
    }
}

/// Classifies free text as likely math.
#[derive(Debug, Clone, Default)]
pub struct MathDetector {
    config: DetectionConfig,
    extra_keywords: Vec<String>,
}

impl MathDetector {
    pub fn new(config: DetectionConfig) -> Self {
        let extra_keywords = config
            .extra_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            config,
            extra_keywords,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// True when [`classify`](Self::classify) finds any math signal.
    pub fn is_likely_math(&self, text: &str) -> bool {
        self.classify(text).is_some()
    }

    /// Return the first math signal found in `text`, if any.
    pub fn classify(&self, text: &str) -> Option<MathSignal> {
        if text.trim().is_empty() {
            return None;
        }
        if MARKER.is_match(text) {
            return Some(MathSignal::Marker);
        }
        if DOLLAR_WRAPPED.is_match(text) {
            return Some(MathSignal::DollarDelimited);
        }
        if SYMBOL_PATTERNS.iter().any(|re| re.is_match(text)) {
            return Some(MathSignal::Symbol);
        }
        if WORDY_PATTERNS.iter().any(|re| re.is_match(text)) || what_is_number_word(text) {
            return Some(MathSignal::WordyPattern);
        }

        let words: Vec<String> = WORDS
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        let has_number = text.chars().any(|c| c.is_ascii_digit())
            || words.iter().any(|w| numbers::lookup(w).is_some());
        if has_number && words.iter().any(|w| OPERATION_WORDS.contains(&w.as_str())) {
            return Some(MathSignal::NumberWithOperation);
        }

        self.keyword_signal(&words, has_number)
    }

    fn keyword_signal(&self, words: &[String], has_number: bool) -> Option<MathSignal> {
        let mut hits: HashSet<&str> = HashSet::new();
        let mut best: Option<(&str, f64)> = None;

        for word in words {
            if word.chars().count() < 4 {
                continue;
            }
            let singular = word.strip_suffix('s').unwrap_or(word);
            if WEAK_KEYWORDS.contains(&word.as_str()) || WEAK_KEYWORDS.contains(&singular) {
                let keyword = WEAK_KEYWORDS
                    .iter()
                    .find(|k| **k == word.as_str() || **k == singular)
                    .copied()
                    .unwrap_or(singular);
                hits.insert(keyword);
                continue;
            }

            for keyword in KEYWORDS
                .iter()
                .copied()
                .chain(self.extra_keywords.iter().map(String::as_str))
            {
                let score = distance_score(word, keyword);
                if score > self.config.keyword_threshold {
                    continue;
                }
                if score <= self.config.strong_threshold {
                    tracing::debug!(word = %word, keyword, score, "strong keyword hit");
                    return Some(MathSignal::Keyword {
                        keyword: keyword.to_string(),
                        score,
                    });
                }
                hits.insert(keyword);
                if !matches!(best, Some((_, s)) if s <= score) {
                    best = Some((keyword, score));
                }
            }
        }

        if hits.len() >= 2 || (hits.len() == 1 && has_number) {
            let (keyword, score) = best.unwrap_or_else(|| {
                let keyword = hits.iter().next().copied().unwrap_or_default();
                (keyword, 0.0)
            });
            return Some(MathSignal::Keyword {
                keyword: keyword.to_string(),
                score,
            });
        }
        None
    }
}

/// `1 - normalised Levenshtein similarity`; 0 means identical.
///
/// Short words only match exactly, otherwise "sine" would swallow "since".
fn distance_score(word: &str, keyword: &str) -> f64 {
    if word == keyword {
        return 0.0;
    }
    if word.chars().count() < FUZZY_MIN_CHARS || keyword.chars().count() < FUZZY_MIN_CHARS {
        return 1.0;
    }
    1.0 - strsim::normalized_levenshtein(word, keyword)
}

fn what_is_number_word(text: &str) -> bool {
    WHAT_IS_WORD
        .captures_iter(text)
        .any(|caps| numbers::lookup(&caps[1]).is_some())
}

static DEFAULT_DETECTOR: LazyLock<MathDetector> = LazyLock::new(MathDetector::default);

/// Classify `text` with the default detector configuration.
pub fn is_likely_math(text: &str) -> bool {
    DEFAULT_DETECTOR.is_likely_math(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_question() {
        assert!(is_likely_math("what is 2+2"));
        assert!(is_likely_math("What is 7 * 8?"));
    }

    #[test]
    fn small_talk_is_not_math() {
        assert!(!is_likely_math("hello how are you"));
        assert!(!is_likely_math("can you help me with my homework since I am tired"));
        assert!(!is_likely_math(""));
        assert!(!is_likely_math("what is your name"));
    }

    #[test]
    fn symbols_and_latex() {
        assert!(is_likely_math("x^2 = 9"));
        assert!(is_likely_math("√16"));
        assert!(is_likely_math(r"\frac{1}{2} of the cake"));
        assert!(is_likely_math("3 < 5"));
    }

    #[test]
    fn operators_between_letters() {
        assert!(is_likely_math("n+1"));
        assert!(is_likely_math("x + y"));
        assert!(is_likely_math("a < b"));
        assert!(is_likely_math("a * b"));
        assert!(is_likely_math("x - y"));
        assert!(is_likely_math("n-1"));
        assert!(is_likely_math("divide by x/2"));
        assert!(!is_likely_math("send me an e-mail"));
        assert!(!is_likely_math("cats and/or dogs"));
        assert!(!is_likely_math("a well-known author"));
    }

    #[test]
    fn wordy_patterns() {
        assert!(is_likely_math("solve for x in this one"));
        assert!(is_likely_math("What's the derivative of sin x"));
        assert!(is_likely_math("please simplify this expression"));
        assert!(is_likely_math("find the area of a circle"));
        assert!(is_likely_math("limit as n goes to infinity"));
        assert!(is_likely_math("what is seven"));
    }

    #[test]
    fn number_with_operation_word() {
        assert!(is_likely_math("two plus three"));
        assert!(is_likely_math("12 divided by four"));
        assert!(!is_likely_math("plus I need a pen"));
    }

    #[test]
    fn fuzzy_keywords() {
        // one typo in a long keyword is a strong hit
        assert!(is_likely_math("help with my polynomal homework"));
        assert!(is_likely_math("quadratic"));
        assert!(is_likely_math("une équation"));
        assert!(!is_likely_math("weather is nice today"));
    }

    #[test]
    fn weak_keywords_need_company() {
        assert!(!is_likely_math("the town square"));
        assert!(is_likely_math("the average of 4 and 6"));
        assert!(is_likely_math("slope of a linear graph"));
    }

    #[test]
    fn markers_and_dollars() {
        assert!(is_likely_math("= 4 / x"));
        assert!(is_likely_math("calc: sqrt 2"));
        assert!(is_likely_math("$a + b$"));
        assert!(!is_likely_math("it costs $5 and $6 more"));
    }

    #[test]
    fn extra_keywords_from_config() {
        let detector = MathDetector::new(DetectionConfig {
            extra_keywords: vec!["Tessellation".into()],
            ..Default::default()
        });
        assert!(detector.is_likely_math("explain tessellation"));
        assert!(!is_likely_math("explain tessellation"));
    }

    #[test]
    fn classify_reports_reason() {
        let detector = MathDetector::default();
        assert_eq!(detector.classify("calc: 1"), Some(MathSignal::Marker));
        assert_eq!(detector.classify("$x$"), Some(MathSignal::DollarDelimited));
        assert!(matches!(
            detector.classify("derivatve"),
            Some(MathSignal::Keyword { .. })
        ));
    }
}
