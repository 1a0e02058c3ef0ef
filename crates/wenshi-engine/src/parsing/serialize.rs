use xi_rope::Rope;

use crate::models::{AnnotationSpan, FlatDocument, span::byte_offset};

use super::marker::Marker;

/// Writes spans back into clean text as postfix markers.
///
/// Spans are spliced in descending order of `end`, so each insertion leaves
/// the offsets of the spans still to be written untouched. Tag codes are
/// written as their labels. Spans without tags produce no marker.
///
/// For disjoint, in-bounds spans over text that contains no marker syntax,
/// `parse(&serialize(text, spans))` gives back `text` and the same spans.
pub fn serialize(clean_text: &str, spans: &[AnnotationSpan]) -> String {
    let mut ordered: Vec<&AnnotationSpan> = spans.iter().filter(|s| !s.tags.is_empty()).collect();
    if ordered.is_empty() {
        return clean_text.to_string();
    }
    ordered.sort_by(|a, b| b.end.cmp(&a.end));

    let mut buffer = Rope::from(clean_text);
    for span in ordered {
        let at = byte_offset(clean_text, span.end);
        let marker = Marker::render(span.width(), &span.tags.labels());
        buffer.edit(at..at, marker);
    }
    buffer.to_string()
}

/// Serializes a whole flat document.
pub fn serialize_document(doc: &FlatDocument) -> String {
    serialize(&doc.clean_text, &doc.spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagSet;
    use crate::parsing::parse;
    use pretty_assertions::assert_eq;

    fn span(text: &str, range: std::ops::Range<usize>, codes: &[&str]) -> AnnotationSpan {
        AnnotationSpan::new(text, range, TagSet::from_codes(codes))
    }

    #[test]
    fn no_spans_returns_text_unchanged() {
        assert_eq!(serialize("漢字", &[]), "漢字");
    }

    #[test]
    fn writes_labels_and_counts() {
        let text = "他去北京";
        let spans = vec![
            span(text, 0..1, &["subj"]),
            span(text, 1..2, &["pred", "v"]),
            span(text, 2..4, &["obj", "n"]),
        ];
        assert_eq!(
            serialize(text, &spans),
            "他{{П}}去{{Ск,Гл}}北京{{2,Д,Cущ}}"
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let text = "abcd";
        let forward = vec![span(text, 0..2, &["n"]), span(text, 3..4, &["v"])];
        let backward = vec![forward[1].clone(), forward[0].clone()];
        assert_eq!(serialize(text, &forward), serialize(text, &backward));
        assert_eq!(serialize(text, &forward), "ab{{2,Cущ}}c{{Гл}}d");
    }

    #[test]
    fn empty_tag_sets_emit_nothing() {
        let text = "abc";
        let spans = vec![span(text, 0..1, &[])];
        assert_eq!(serialize(text, &spans), "abc");
    }

    #[test]
    fn unknown_codes_are_written_raw() {
        let text = "ab";
        let spans = vec![span(text, 0..2, &["custom"])];
        assert_eq!(serialize(text, &spans), "ab{{2,custom}}");
    }

    #[test]
    fn round_trip_preserves_document() {
        let text = "我们\n学习中文。";
        let mut doc = FlatDocument::new(text);
        doc.place(0..2, TagSet::from_codes(["subj", "pron"]));
        doc.place(3..5, TagSet::from_codes(["pred"]));
        doc.place(5..7, TagSet::from_codes(["obj", "n"]));

        let raw = serialize_document(&doc);
        let reparsed = parse(&raw);
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn second_round_trip_is_stable() {
        let raw = "ab{{9,n}}{{zzz}}c{{v,v}}";
        let once = serialize_document(&parse(raw));
        let twice = serialize_document(&parse(&once));
        assert_eq!(once, twice);
        assert_eq!(once, "ab{{2,Cущ}}c{{Гл}}");
    }
}
