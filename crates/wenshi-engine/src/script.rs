//! Classification of characters against the CJK unified ideograph blocks.
//!
//! Selections may only be tagged when they consist purely of ideographs, and
//! plain-text files must be predominantly ideographic to be opened.

use std::sync::OnceLock;

use regex::Regex;

/// Whether a character belongs to the annotated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    InScript,
    OutOfScript,
}

/// Unified ideographs, Extension A, Extensions B–F.
const RANGES: [(u32, u32); 3] = [
    (0x3400, 0x4DBF),
    (0x4E00, 0x9FFF),
    (0x2_0000, 0x2_EBEF),
];

pub fn classify(c: char) -> ScriptClass {
    let cp = c as u32;
    if RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp)) {
        ScriptClass::InScript
    } else {
        ScriptClass::OutOfScript
    }
}

pub fn is_script_char(c: char) -> bool {
    classify(c) == ScriptClass::InScript
}

/// True iff `text` is non-empty and every character is an ideograph.
pub fn is_pure_script(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_script_char)
}

/// True iff any character is an ideograph.
pub fn contains_script(text: &str) -> bool {
    text.chars().any(is_script_char)
}

/// Share of ideographs among characters that are neither whitespace nor
/// punctuation. `None` when there are no such characters.
pub fn script_ratio(text: &str) -> Option<f64> {
    let (total, in_script) = text
        .chars()
        .filter(|c| !c.is_whitespace() && !is_punctuation(*c))
        .fold((0usize, 0usize), |(total, hits), c| {
            (total + 1, hits + usize::from(is_script_char(c)))
        });
    (total > 0).then(|| in_script as f64 / total as f64)
}

/// Unicode general category P.
fn is_punctuation(c: char) -> bool {
    static PUNCT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        PUNCT_REGEX.get_or_init(|| Regex::new(r"^\p{P}$").expect("Invalid punctuation regex"));
    let mut buf = [0u8; 4];
    regex.is_match(c.encode_utf8(&mut buf))
}
