use std::ops::Range;

use serde::Serialize;

use crate::models::tag;

/// Ordered set of tag codes.
///
/// Insertion order is kept for display; equality ignores order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from codes, dropping duplicates.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for code in codes {
            set.insert(code.as_ref());
        }
        set
    }

    /// Returns false if the code was already present.
    pub fn insert(&mut self, code: &str) -> bool {
        if self.contains(code) {
            return false;
        }
        self.0.push(code.to_string());
        true
    }

    /// Returns false if the code was not present.
    pub fn remove(&mut self, code: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c != code);
        self.0.len() != before
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    pub fn union_with(&mut self, other: &TagSet) {
        for code in other.iter() {
            self.insert(code);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined display labels, as written into markers.
    pub fn labels(&self) -> String {
        self.iter().map(tag::label_for).collect::<Vec<_>>().join(",")
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl PartialEq for TagSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|c| other.contains(c))
    }
}

impl Eq for TagSet {}

/// A tagged `[start, end)` region of clean text, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSpan {
    pub start: usize,
    pub end: usize,
    /// The covered substring; kept for integrity checks and display.
    pub text: String,
    pub tags: TagSet,
    /// Width hint written into the notation. Present iff the width exceeds 1.
    pub count: Option<usize>,
}

impl AnnotationSpan {
    /// Create a span over `range` of `clean_text`.
    ///
    /// The range must be non-empty and within bounds; callers clamp first.
    pub fn new(clean_text: &str, range: Range<usize>, tags: TagSet) -> Self {
        let width = range.end - range.start;
        Self {
            text: char_slice(clean_text, range.clone()).to_string(),
            start: range.start,
            end: range.end,
            tags,
            count: (width > 1).then_some(width),
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn width(&self) -> usize {
        self.end - self.start
    }
}

/// How an existing span relates to a candidate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    Disjoint,
    /// Same bounds.
    Exact,
    /// The span lies inside the candidate without matching it.
    Inside,
    /// They intersect but neither is inside the other, or the candidate lies
    /// strictly inside the span.
    Partial,
}

/// Classify `span` against `candidate`.
pub fn overlap(span: &Range<usize>, candidate: &Range<usize>) -> Overlap {
    if span.start >= candidate.end || candidate.start >= span.end {
        Overlap::Disjoint
    } else if span == candidate {
        Overlap::Exact
    } else if span.start >= candidate.start && span.end <= candidate.end {
        Overlap::Inside
    } else {
        Overlap::Partial
    }
}

/// Result of placing a span into a [`FlatDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Added,
    /// Same range as an existing span; tags were merged into it.
    Merged { index: usize },
    /// Overlaps an existing span illegally; nothing changed.
    Rejected { index: usize, overlap: Overlap },
}

/// Clean text plus its annotation spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatDocument {
    pub clean_text: String,
    pub spans: Vec<AnnotationSpan>,
}

impl FlatDocument {
    pub fn new(clean_text: impl Into<String>) -> Self {
        Self {
            clean_text: clean_text.into(),
            spans: Vec::new(),
        }
    }

    /// Length of the clean text in characters.
    pub fn char_len(&self) -> usize {
        self.clean_text.chars().count()
    }

    pub fn text_in(&self, range: Range<usize>) -> &str {
        char_slice(&self.clean_text, range)
    }

    /// Place a span, keeping spans pairwise disjoint.
    ///
    /// Returns `None` for an empty tag set or an empty or out-of-bounds
    /// range.
    pub fn place(&mut self, range: Range<usize>, tags: TagSet) -> Option<Placement> {
        if tags.is_empty() || range.start >= range.end || range.end > self.char_len() {
            return None;
        }

        for (index, existing) in self.spans.iter_mut().enumerate() {
            match overlap(&existing.range(), &range) {
                Overlap::Disjoint => {}
                Overlap::Exact => {
                    existing.tags.union_with(&tags);
                    return Some(Placement::Merged { index });
                }
                other => return Some(Placement::Rejected { index, overlap: other }),
            }
        }

        let span = AnnotationSpan::new(&self.clean_text, range, tags);
        self.spans.push(span);
        Some(Placement::Added)
    }

    /// Index of the span whose bounds equal `range`.
    pub fn exact_span(&self, range: &Range<usize>) -> Option<usize> {
        self.spans.iter().position(|s| s.range() == *range)
    }

    /// Spans ordered by start offset.
    pub fn sorted_spans(&self) -> Vec<&AnnotationSpan> {
        let mut spans: Vec<_> = self.spans.iter().collect();
        spans.sort_by_key(|s| (s.start, s.end));
        spans
    }
}

/// Byte offset of the `char_idx`-th character, or `s.len()` past the end.
pub fn byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(b, _)| b)
}

/// Slice `s` by character offsets, clamping to its length.
pub fn char_slice(s: &str, range: Range<usize>) -> &str {
    let start = byte_offset(s, range.start);
    let end = byte_offset(s, range.end.max(range.start));
    &s[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn tag_set_equality_ignores_order() {
        let a = TagSet::from_codes(["n", "subj"]);
        let b = TagSet::from_codes(["subj", "n"]);
        assert_eq!(a, b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec!["n", "subj"]);
    }

    #[test]
    fn tag_set_drops_duplicates() {
        let set = TagSet::from_codes(["n", "n", "v"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn tag_set_labels_fall_back_to_codes() {
        let set = TagSet::from_codes(["subj", "custom"]);
        assert_eq!(set.labels(), "П,custom");
    }

    #[test]
    fn span_count_only_for_wide_spans() {
        let narrow = AnnotationSpan::new("漢字", 0..1, TagSet::from_codes(["n"]));
        let wide = AnnotationSpan::new("漢字", 0..2, TagSet::from_codes(["n"]));
        assert_eq!(narrow.count, None);
        assert_eq!(narrow.text, "漢");
        assert_eq!(wide.count, Some(2));
        assert_eq!(wide.text, "漢字");
    }

    #[rstest]
    #[case(2..5, 3..4, Overlap::Partial)]
    #[case(2..5, 2..5, Overlap::Exact)]
    #[case(2..5, 0..8, Overlap::Inside)]
    #[case(2..5, 5..8, Overlap::Disjoint)]
    #[case(2..5, 0..2, Overlap::Disjoint)]
    #[case(2..5, 4..8, Overlap::Partial)]
    #[case(2..5, 2..4, Overlap::Partial)]
    fn classifies_overlap(
        #[case] span: Range<usize>,
        #[case] candidate: Range<usize>,
        #[case] expected: Overlap,
    ) {
        assert_eq!(overlap(&span, &candidate), expected);
    }

    #[test]
    fn place_merges_identical_ranges() {
        let mut doc = FlatDocument::new("漢字文");
        assert_eq!(
            doc.place(0..2, TagSet::from_codes(["n"])),
            Some(Placement::Added)
        );
        assert_eq!(
            doc.place(0..2, TagSet::from_codes(["v"])),
            Some(Placement::Merged { index: 0 })
        );
        assert_eq!(doc.spans.len(), 1);
        assert_eq!(doc.spans[0].tags, TagSet::from_codes(["n", "v"]));
    }

    #[test]
    fn place_rejects_overlaps() {
        let mut doc = FlatDocument::new("漢字文章");
        doc.place(1..3, TagSet::from_codes(["n"]));
        assert_eq!(
            doc.place(0..2, TagSet::from_codes(["v"])),
            Some(Placement::Rejected {
                index: 0,
                overlap: Overlap::Partial
            })
        );
        assert_eq!(
            doc.place(0..4, TagSet::from_codes(["v"])),
            Some(Placement::Rejected {
                index: 0,
                overlap: Overlap::Inside
            })
        );
        assert_eq!(doc.spans.len(), 1);
    }

    #[test]
    fn place_ignores_degenerate_input() {
        let mut doc = FlatDocument::new("ab");
        assert_eq!(doc.place(1..1, TagSet::from_codes(["n"])), None);
        assert_eq!(doc.place(0..3, TagSet::from_codes(["n"])), None);
        assert_eq!(doc.place(0..1, TagSet::new()), None);
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn char_slice_handles_multibyte_and_astral() {
        let s = "a𠀀漢b";
        assert_eq!(char_slice(s, 1..3), "𠀀漢");
        assert_eq!(char_slice(s, 3..10), "b");
        assert_eq!(char_slice(s, 5..6), "");
    }
}
