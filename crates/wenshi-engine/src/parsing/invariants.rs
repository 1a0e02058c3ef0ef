use crate::models::{FlatDocument, Overlap, overlap, span::char_slice};

/// Validates the structural invariants of a flat document.
///
/// Asserts that:
/// - every span is non-empty and within the clean text
/// - each span's `text` matches the clean text at its offsets
/// - `count` is present exactly for spans wider than one character, and
///   equals the width
/// - every span carries at least one tag
/// - spans are pairwise disjoint
///
/// # Panics
/// Panics with a descriptive message if any invariant is violated.
pub fn check(doc: &FlatDocument) {
    let n = doc.char_len();
    for (i, s) in doc.spans.iter().enumerate() {
        assert!(
            s.start < s.end && s.end <= n,
            "span #{i} out of bounds: {:?} (text len: {n})",
            s.range()
        );
        assert_eq!(
            s.text,
            char_slice(&doc.clean_text, s.range()),
            "span #{i} text does not match its offsets"
        );
        let expected_count = (s.width() > 1).then_some(s.width());
        assert_eq!(s.count, expected_count, "span #{i} has inconsistent count");
        assert!(!s.tags.is_empty(), "span #{i} has no tags");

        for (j, other) in doc.spans.iter().enumerate().skip(i + 1) {
            assert_eq!(
                overlap(&other.range(), &s.range()),
                Overlap::Disjoint,
                "spans #{i} {:?} and #{j} {:?} overlap",
                s.range(),
                other.range()
            );
        }
    }
}
