//! Content checks applied before a document is opened or saved.

use std::sync::OnceLock;

use regex::Regex;

use crate::script;

/// Smallest share of ideographs (among non-space, non-punctuation
/// characters) a document must have.
pub const MIN_SCRIPT_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("File is empty")]
    Empty,
    #[error("File contains XML tags (< or >) which are not allowed in .txt files")]
    Markup,
    #[error("File contains no text characters")]
    NoText,
    #[error("File must contain at least 50% CJK characters (found {:.0}%)", percent(.ratio))]
    TooFewIdeographs { ratio: f64 },
}

fn percent(ratio: &f64) -> f64 {
    ratio * 100.0
}

/// Checks that annotated text is acceptable document content.
///
/// Annotation markers are ignored. The text must be non-blank, free of `<`
/// and `>`, and at least half ideographic.
pub fn validate_text(content: &str) -> Result<(), ValidationError> {
    static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
    let marker_regex =
        MARKER_REGEX.get_or_init(|| Regex::new(r"\{\{[^}]*\}\}").expect("Invalid marker regex"));

    if content.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    let clean = marker_regex.replace_all(content, "");
    if clean.contains(['<', '>']) {
        return Err(ValidationError::Markup);
    }

    let ratio = script::script_ratio(&clean).ok_or(ValidationError::NoText)?;
    if ratio < MIN_SCRIPT_RATIO {
        return Err(ValidationError::TooFewIdeographs { ratio });
    }
    Ok(())
}
