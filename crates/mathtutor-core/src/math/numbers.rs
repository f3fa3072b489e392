//! English number words to digits.
//!
//! Best effort: runs of number words ("twenty one", "one hundred and five")
//! collapse into a single integer, common misspellings are accepted, and a
//! single typo is forgiven on longer words.

use std::sync::LazyLock;

use regex::Regex;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("Invalid regex: word pattern"));

const UNITS: &[(&str, u64)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
];

const TENS: &[(&str, u64)] = &[
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
];

const SCALES: &[(&str, u64)] = &[
    ("hundred", 100),
    ("thousand", 1_000),
    ("million", 1_000_000),
];

const MISSPELLINGS: &[(&str, &str)] = &[
    ("fourty", "forty"),
    ("thre", "three"),
    ("fiv", "five"),
    ("ninty", "ninety"),
    ("tweleve", "twelve"),
    ("eigth", "eight"),
    ("sevn", "seven"),
    ("fivteen", "fifteen"),
    ("twelv", "twelve"),
];

/// Words shorter than this only match exactly.
const FUZZY_MIN_LEN: usize = 6;

/// The grammatical role of a number word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberWord {
    /// zero through nineteen.
    Unit(u64),
    /// twenty, thirty, ... ninety.
    Tens(u64),
    /// hundred, thousand, million.
    Scale(u64),
}

fn exact(word: &str) -> Option<NumberWord> {
    let find = |table: &[(&str, u64)]| {
        table
            .iter()
            .find(|(w, _)| *w == word)
            .map(|(_, value)| *value)
    };
    find(UNITS)
        .map(NumberWord::Unit)
        .or_else(|| find(TENS).map(NumberWord::Tens))
        .or_else(|| find(SCALES).map(NumberWord::Scale))
}

/// Look up a number word, tolerating misspellings.
pub fn lookup(word: &str) -> Option<NumberWord> {
    let word = word.to_lowercase();
    if let Some(found) = exact(&word) {
        return Some(found);
    }
    if let Some((_, fixed)) = MISSPELLINGS.iter().find(|(typo, _)| *typo == word) {
        return exact(fixed);
    }
    // Ordinals ("fifth", "sixth") are a single edit away from cardinals.
    if word.len() < FUZZY_MIN_LEN || word.ends_with("th") {
        return None;
    }

    UNITS
        .iter()
        .chain(TENS)
        .chain(SCALES)
        .map(|(candidate, _)| *candidate)
        .filter(|candidate| candidate.len() >= FUZZY_MIN_LEN)
        .filter(|candidate| candidate.as_bytes()[0] == word.as_bytes()[0])
        .find(|candidate| strsim::levenshtein(candidate, &word) == 1)
        .and_then(exact)
}

/// Whether `next` can extend a number phrase whose last word was `prev`.
fn can_follow(prev: NumberWord, next: NumberWord) -> bool {
    match (prev, next) {
        (NumberWord::Tens(_), NumberWord::Unit(u)) => (1..10).contains(&u),
        (NumberWord::Unit(u), NumberWord::Scale(_)) => u > 0,
        (NumberWord::Tens(_), NumberWord::Scale(_)) => true,
        (NumberWord::Scale(_), NumberWord::Unit(u)) => u > 0,
        (NumberWord::Scale(_), NumberWord::Tens(_)) => true,
        (NumberWord::Scale(a), NumberWord::Scale(b)) => b > a,
        _ => false,
    }
}

/// Fold a valid sequence of number words into its value.
fn fold(words: &[NumberWord]) -> u64 {
    let mut total = 0u64;
    let mut current = 0u64;
    for word in words {
        match *word {
            NumberWord::Unit(v) | NumberWord::Tens(v) => current += v,
            NumberWord::Scale(100) => current = current.max(1) * 100,
            NumberWord::Scale(scale) => {
                total += current.max(1) * scale;
                current = 0;
            }
        }
    }
    total + current
}

/// Replace runs of English number words with digits.
pub fn words_to_digits(text: &str) -> String {
    let tokens: Vec<_> = WORD.find_iter(text).collect();
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    let mut i = 0;

    while i < tokens.len() {
        let Some(first) = lookup(tokens[i].as_str()) else {
            i += 1;
            continue;
        };

        let mut words = vec![first];
        let mut end = i;
        let mut j = i + 1;
        while j < tokens.len() {
            let gap = &text[tokens[j - 1].end()..tokens[j].start()];
            if !is_joiner(gap) {
                break;
            }
            let prev = words[words.len() - 1];
            // "one hundred and five"
            if tokens[j].as_str().eq_ignore_ascii_case("and")
                && matches!(prev, NumberWord::Scale(_))
                && j + 1 < tokens.len()
                && is_joiner(&text[tokens[j].end()..tokens[j + 1].start()])
            {
                match lookup(tokens[j + 1].as_str()) {
                    Some(next) if can_follow(prev, next) => {
                        words.push(next);
                        end = j + 1;
                        j += 2;
                        continue;
                    }
                    _ => break,
                }
            }
            match lookup(tokens[j].as_str()) {
                Some(next) if can_follow(prev, next) => {
                    words.push(next);
                    end = j;
                    j += 1;
                }
                _ => break,
            }
        }

        out.push_str(&text[last_end..tokens[i].start()]);
        out.push_str(&fold(&words).to_string());
        last_end = tokens[end].end();
        i = end + 1;
    }

    out.push_str(&text[last_end..]);
    out
}

fn is_joiner(gap: &str) -> bool {
    !gap.is_empty() && gap.chars().all(|c| c.is_whitespace() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_words() {
        assert_eq!(words_to_digits("two plus three"), "2 plus 3");
        assert_eq!(words_to_digits("zero"), "0");
        assert_eq!(words_to_digits("Seventeen apples"), "17 apples");
    }

    #[test]
    fn compound_numbers() {
        assert_eq!(words_to_digits("twenty one"), "21");
        assert_eq!(words_to_digits("forty-two"), "42");
        assert_eq!(words_to_digits("one hundred and five"), "105");
        assert_eq!(words_to_digits("three thousand four hundred"), "3400");
        assert_eq!(words_to_digits("two million"), "2000000");
    }

    #[test]
    fn adjacent_units_stay_separate() {
        assert_eq!(words_to_digits("one two three"), "1 2 3");
        assert_eq!(words_to_digits("twenty thirty"), "20 30");
    }

    #[test]
    fn misspellings() {
        assert_eq!(words_to_digits("fourty"), "40");
        assert_eq!(words_to_digits("thre times fiv"), "3 times 5");
        assert_eq!(words_to_digits("sevnteen"), "17");
    }

    #[test]
    fn leaves_other_words_alone() {
        assert_eq!(words_to_digits("someone said hello"), "someone said hello");
        assert_eq!(words_to_digits("one fifth"), "1 fifth");
        assert_eq!(words_to_digits("bread and butter"), "bread and butter");
    }

    #[test]
    fn trailing_and_is_kept() {
        assert_eq!(words_to_digits("one hundred and cats"), "100 and cats");
    }
}
