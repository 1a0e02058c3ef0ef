//! Plain-text clipboard exchange.
//!
//! Copying yields the selected text with paragraphs joined by `\n`; no
//! notation is carried. Pasted text is reduced to plain words: annotation
//! markers, Markdown formatting and XML tags are removed and whitespace is
//! collapsed to single spaces.

use std::ops::Range;
use std::sync::OnceLock;

use pulldown_cmark::{Event, Options, Parser, TagEnd};
use regex::Regex;

use crate::editing::tree::{Document, StructuredPosition};

/// Text copied out of `range`.
pub fn copy_text(doc: &Document, range: Range<StructuredPosition>) -> String {
    doc.text_between(range, "\n")
}

/// Cleans clipboard text before it is inserted.
pub fn clean_pasted_text(text: &str) -> String {
    static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    static SPACE_REGEX: OnceLock<Regex> = OnceLock::new();

    let marker_regex = MARKER_REGEX.get_or_init(|| {
        Regex::new(r"\{\{(\d+,)?[\p{L}\p{N},]*\}\}").expect("Invalid marker regex")
    });
    let tag_regex = TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));
    let space_regex = SPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("Invalid space regex"));

    let without_markers = marker_regex.replace_all(text, "");
    let plain = strip_markdown(&without_markers);
    let without_tags = tag_regex.replace_all(&plain, "");
    space_regex
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// Keeps the text content of a Markdown document, dropping syntax and link
/// targets. Raw HTML is passed through for the tag filter.
fn strip_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Text(t) | Event::Code(t) | Event::Html(t) | Event::InlineHtml(t) => {
                out.push_str(&t)
            }
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => out.push(' '),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::tree::DocumentTree;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("我们{{2,П}}学习{{Ск}}", "我们学习")]
    #[case("**我们** 学习", "我们 学习")]
    #[case("`代码` and ~~删除~~", "代码 and 删除")]
    #[case("[中文](https://example.com)", "中文")]
    #[case("<p>你好</p>", "你好")]
    #[case("  多个\n\n   空白  ", "多个 空白")]
    #[case("", "")]
    fn cleans_pasted_text(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean_pasted_text(input), expected);
    }

    #[test]
    fn cleans_markdown_structure() {
        let input = "# 标题\n\n- **我们** 学习\n- [中文](http://x.com)\n\n1. 第一";
        assert_eq!(clean_pasted_text(input), "标题 我们 学习 中文 第一");
    }

    #[test]
    fn copy_joins_paragraphs_with_newline() {
        let mut doc = Document::from_text("我们\n学习");
        doc.set_selection(StructuredPosition(2)..StructuredPosition(6));
        assert_eq!(copy_text(&doc, doc.selection()), "们\n学");
    }
}
