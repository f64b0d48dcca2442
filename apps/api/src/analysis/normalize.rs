//! Job-description cleanup before it is embedded in a prompt.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n\t]+").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,!?:)%])").expect("static regex"));

/// Punctuation kept besides letters, digits and spaces.
const ALLOWED_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', '\'', '"', '(', ')', '-', ':', '+', '*', '/', '&', '%', '@',
];

/// Normalizes a pasted job description:
///
/// 1. newlines and tabs become spaces
/// 2. whitespace runs collapse to one space
/// 3. typographic quotes, dashes and ellipses fold to ASCII
/// 4. anything outside the allow-list becomes a space (runs collapse again)
/// 5. whitespace before closing punctuation is removed
/// 6. the result is trimmed
///
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(raw: &str) -> String {
    let text = LINE_BREAKS.replace_all(raw, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = fold_typography(&text);
    let text = strip_disallowed(&text);
    let text = WHITESPACE.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    text.trim().to_string()
}

fn fold_typography(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => out.push('"'),
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
            | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            other => out.push(other),
        }
    }
    out
}

fn strip_disallowed(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(&c) {
                c
            } else {
                ' '
            }
        })
        .collect()
}
