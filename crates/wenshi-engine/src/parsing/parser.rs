use crate::models::{FlatDocument, Placement, TagSet, tag};

use super::{cursor::Cursor, marker::Marker};

/// A marker found in the raw text, before tag resolution.
struct RawMarker<'a> {
    /// Byte offset of `{{` in the raw text.
    start: usize,
    /// Byte offset just past `}}`.
    end: usize,
    count: Option<usize>,
    body: &'a str,
}

/// Parses annotated text into clean text and spans.
///
/// Never fails. Text that does not form a complete marker is kept verbatim;
/// markers whose tags all fail to resolve, or whose count is zero, are
/// removed without producing a span.
///
/// Markers are postfix: `{{3,n}}` tags the three characters of clean text
/// emitted just before it. A count larger than the available text is
/// clamped so the span starts at offset 0.
///
/// Spans are returned in marker order. A marker covering exactly the range
/// of an earlier one merges its tags into that span; a marker that
/// partially overlaps or nests with an earlier span is dropped.
pub fn parse(raw: &str) -> FlatDocument {
    let mut cur = Cursor::new(raw);
    let mut clean = String::with_capacity(raw.len());
    let mut clean_len = 0usize;
    let mut text_start = 0usize;
    let mut pending = Vec::new();

    fn flush_text(clean: &mut String, clean_len: &mut usize, text: &str) {
        clean.push_str(text);
        *clean_len += text.chars().count();
    }

    while !cur.eof() {
        if let Some(marker) = try_parse_marker(&mut cur) {
            flush_text(&mut clean, &mut clean_len, &raw[text_start..marker.start]);
            text_start = marker.end;

            let count = marker.count.unwrap_or(1);
            let tags = resolve_tags(marker.body);
            if tags.is_empty() || count == 0 {
                log::debug!(
                    "discarding marker {:?}: no usable tags or zero count",
                    &raw[marker.start..marker.end]
                );
                continue;
            }

            let start = clean_len.saturating_sub(count);
            if clean_len > start {
                pending.push((start..clean_len, tags));
            }
            continue;
        }
        cur.bump();
    }
    flush_text(&mut clean, &mut clean_len, &raw[text_start..]);

    let mut doc = FlatDocument::new(clean);
    for (range, tags) in pending {
        if let Some(Placement::Rejected { index, overlap }) = doc.place(range.clone(), tags) {
            log::warn!("dropping marker over {range:?}: {overlap:?} with span #{index}");
        }
    }
    doc
}

/// Attempts to parse a marker at the current position.
///
/// Returns `None` if the input here is not a complete marker; the cursor is
/// then left where it was.
fn try_parse_marker<'a>(cur: &mut Cursor<'a>) -> Option<RawMarker<'a>> {
    if !cur.starts_with(Marker::OPEN) {
        return None;
    }

    let saved = cur.clone();
    let start = cur.pos();
    cur.bump_str(Marker::OPEN);

    let after_open = cur.clone();
    let digits = cur.eat_while(|c| c.is_ascii_digit());
    let count = if !digits.is_empty() && cur.peek() == Some(Marker::SEP) {
        cur.bump();
        // Absurdly long counts saturate and are clamped to the text anyway.
        Some(digits.parse::<usize>().unwrap_or(usize::MAX))
    } else {
        *cur = after_open;
        None
    };

    let body = cur.eat_while(Marker::is_body_char);

    if !cur.starts_with(Marker::CLOSE) {
        *cur = saved;
        return None;
    }
    cur.bump_str(Marker::CLOSE);

    Some(RawMarker {
        start,
        end: cur.pos(),
        count,
        body,
    })
}

/// Resolves comma-separated tokens, dropping the ones that match nothing.
fn resolve_tags(body: &str) -> TagSet {
    let mut tags = TagSet::new();
    for token in body.split(Marker::SEP).filter(|t| !t.is_empty()) {
        match tag::resolve_token(token) {
            Some(code) => {
                tags.insert(code);
            }
            None => log::debug!("unknown tag token {token:?}"),
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tags(codes: &[&str]) -> TagSet {
        TagSet::from_codes(codes)
    }

    #[test]
    fn parse_plain_text() {
        let doc = parse("漢字 and text");
        assert_eq!(doc.clean_text, "漢字 and text");
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn parse_postfix_marker_with_count() {
        let doc = parse("ab{{2,n}}cd");
        assert_eq!(doc.clean_text, "abcd");
        assert_eq!(doc.spans.len(), 1);
        assert_eq!(doc.spans[0].range(), 0..2);
        assert_eq!(doc.spans[0].text, "ab");
        assert_eq!(doc.spans[0].tags, tags(&["n"]));
        assert_eq!(doc.spans[0].count, Some(2));
    }

    #[test]
    fn parse_marker_defaults_to_one_char() {
        let doc = parse("他{{П}}去{{Гл}}");
        assert_eq!(doc.clean_text, "他去");
        assert_eq!(doc.spans[0].range(), 0..1);
        assert_eq!(doc.spans[0].tags, tags(&["subj"]));
        assert_eq!(doc.spans[1].range(), 1..2);
        assert_eq!(doc.spans[1].tags, tags(&["v"]));
        assert_eq!(doc.spans[1].count, None);
    }

    #[test]
    fn empty_marker_is_dropped() {
        let doc = parse("abc{{}}def");
        assert_eq!(doc.clean_text, "abcdef");
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn unknown_only_tag_drops_marker() {
        let doc = parse("x{{zzz}}");
        assert_eq!(doc.clean_text, "x");
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn unknown_tokens_are_filtered() {
        let doc = parse("漢{{zzz,n,,n}}");
        assert_eq!(doc.spans.len(), 1);
        assert_eq!(doc.spans[0].tags, tags(&["n"]));
    }

    #[test]
    fn label_and_code_are_equivalent() {
        let by_label = parse("текст{{П}}");
        let by_code = parse("текст{{subj}}");
        assert_eq!(by_label.spans[0].tags, by_code.spans[0].tags);
        assert_eq!(by_label, by_code);
    }

    #[test]
    fn labels_resolve_ignoring_case() {
        let doc = parse("字{{гл}}");
        assert_eq!(doc.spans[0].tags, tags(&["v"]));
    }

    #[test]
    fn count_is_clamped_to_available_text() {
        let doc = parse("ab{{5,n}}");
        assert_eq!(doc.spans[0].range(), 0..2);
        assert_eq!(doc.spans[0].count, Some(2));
    }

    #[test]
    fn zero_count_drops_marker() {
        let doc = parse("ab{{0,n}}c");
        assert_eq!(doc.clean_text, "abc");
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn marker_at_start_has_nothing_to_annotate() {
        let doc = parse("{{n}}ab");
        assert_eq!(doc.clean_text, "ab");
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn unterminated_marker_is_literal() {
        let doc = parse("ab{{n}cd");
        assert_eq!(doc.clean_text, "ab{{n}cd");
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn invalid_body_is_literal() {
        let doc = parse("ab{{n v}}");
        assert_eq!(doc.clean_text, "ab{{n v}}");
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn marker_after_extra_brace() {
        let doc = parse("a{{{n}}");
        assert_eq!(doc.clean_text, "a{");
        assert_eq!(doc.spans[0].range(), 1..2);
    }

    #[test]
    fn count_without_comma_is_a_token() {
        // "3" is a body token, not a count; it resolves to nothing.
        let doc = parse("abc{{3}}");
        assert_eq!(doc.clean_text, "abc");
        assert!(doc.spans.is_empty());
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let doc = parse("𠀀漢字{{2,n}}");
        assert_eq!(doc.spans[0].range(), 1..3);
        assert_eq!(doc.spans[0].text, "漢字");
    }

    #[test]
    fn identical_ranges_merge() {
        let doc = parse("漢字{{2,n}}{{2,v}}");
        assert_eq!(doc.spans.len(), 1);
        assert_eq!(doc.spans[0].tags, tags(&["n", "v"]));
    }

    #[test]
    fn overlapping_markers_keep_the_first() {
        // Second marker covers [0,3) which contains [1,3).
        let doc = parse("abc{{2,n}}{{3,v}}");
        assert_eq!(doc.spans.len(), 1);
        assert_eq!(doc.spans[0].range(), 1..3);
        assert_eq!(doc.spans[0].tags, tags(&["n"]));
    }

    #[test]
    fn spans_follow_marker_order() {
        let doc = parse("a{{n}}b{{v}}c{{adj}}");
        let ends: Vec<_> = doc.spans.iter().map(|s| s.end).collect();
        assert_eq!(ends, vec![1, 2, 3]);
    }

    #[test]
    fn huge_count_saturates() {
        let doc = parse("ab{{99999999999999999999999,n}}");
        assert_eq!(doc.spans[0].range(), 0..2);
    }
}
