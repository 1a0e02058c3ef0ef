//! Structured host document.
//!
//! The document is a list of paragraphs holding characters and hard breaks.
//! Characters may carry an [`AnnotationMark`]. Positions follow the usual
//! rich-text model: opening a paragraph costs one position, every character
//! or hard break one, closing the paragraph one more. The first character of
//! the first paragraph therefore sits at position 1.

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use crate::editing::commands::Cmd;
use crate::editing::patch::Patch;
use crate::models::{AnnotationSpan, tag};

/// A position in the structured document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StructuredPosition(pub usize);

impl StructuredPosition {
    pub fn get(self) -> usize {
        self.0
    }

    pub fn offset(self, n: usize) -> Self {
        Self(self.0 + n)
    }
}

impl fmt::Display for StructuredPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Inline mark attached to annotated characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationMark {
    pub tags: Vec<String>,
    pub color: String,
    pub label: String,
    pub count: usize,
    pub annotation_index: usize,
}

/// Colour of marks that have not been through a rebuild yet.
pub const PENDING_COLOR: &str = "#999999";

impl AnnotationMark {
    /// Mark for the `index`-th span of a parsed document.
    pub fn for_span(index: usize, span: &AnnotationSpan) -> Self {
        Self {
            tags: span.tags.to_vec(),
            color: tag::palette_color(index).to_string(),
            label: span.tags.labels(),
            count: span.width(),
            annotation_index: index,
        }
    }

    /// Mark applied by a toggle before the next rebuild renumbers it.
    ///
    /// `serial` keeps adjacent pending marks with equal tags from merging
    /// into one run.
    pub fn pending(tags: Vec<String>, count: usize, serial: usize) -> Self {
        let label = tags
            .iter()
            .map(|c| tag::label_for(c))
            .collect::<Vec<_>>()
            .join(",");
        Self {
            tags,
            color: PENDING_COLOR.to_string(),
            label,
            count,
            annotation_index: serial,
        }
    }
}

/// Read-only view of a node, yielded in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRef<'a> {
    Paragraph {
        pos: StructuredPosition,
        index: usize,
    },
    /// A maximal run of characters sharing the same mark.
    Text {
        pos: StructuredPosition,
        text: String,
        mark: Option<&'a AnnotationMark>,
    },
    HardBreak {
        pos: StructuredPosition,
    },
}

/// What the annotation layer needs from a host document.
pub trait DocumentTree {
    /// All nodes in document order.
    fn descendants(&self) -> Vec<NodeRef<'_>>;

    /// Total structural size (the position just past the last paragraph).
    fn content_size(&self) -> usize;

    /// Replace everything with unmarked text; `\n` separates paragraphs.
    fn replace_content(&mut self, clean_text: &str);

    fn add_mark(&mut self, range: Range<StructuredPosition>, mark: AnnotationMark);

    fn remove_marks(&mut self, range: Range<StructuredPosition>);

    fn selection(&self) -> Range<StructuredPosition>;

    fn set_selection(&mut self, selection: Range<StructuredPosition>);
}

#[derive(Debug, Clone, PartialEq)]
enum Unit {
    Char(char, Option<Rc<AnnotationMark>>),
    Break,
}

impl Unit {
    fn mark(&self) -> Option<&Rc<AnnotationMark>> {
        match self {
            Unit::Char(_, mark) => mark.as_ref(),
            Unit::Break => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Paragraph {
    units: Vec<Unit>,
}

impl Paragraph {
    fn from_line(line: &str) -> Self {
        Self {
            units: line.chars().map(|c| Unit::Char(c, None)).collect(),
        }
    }

    fn size(&self) -> usize {
        self.units.len() + 2
    }
}

/// In-memory implementation of [`DocumentTree`] with editing commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    paragraphs: Vec<Paragraph>,
    selection: Range<StructuredPosition>,
    version: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: one empty paragraph, cursor inside it.
    pub fn new() -> Self {
        Self {
            paragraphs: vec![Paragraph::default()],
            selection: StructuredPosition(1)..StructuredPosition(1),
            version: 0,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.replace_content(text);
        doc
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    /// Text of the document, paragraphs and hard breaks rendered as `\n`.
    pub fn plain_text(&self) -> String {
        self.text_between(StructuredPosition(0)..StructuredPosition(self.content_size()), "\n")
    }

    /// Text inside `range`, with `block_separator` between paragraphs.
    /// Hard breaks come out as `\n`.
    pub fn text_between(&self, range: Range<StructuredPosition>, block_separator: &str) -> String {
        let (from, to) = (range.start.0, range.end.0);
        let mut out = String::new();
        let mut first = true;
        let mut start = 0;
        for para in &self.paragraphs {
            let end = start + para.size();
            if start < to && from < end {
                if !first {
                    out.push_str(block_separator);
                }
                first = false;
                for (u, unit) in para.units.iter().enumerate() {
                    let pos = start + 1 + u;
                    if pos >= from && pos < to {
                        match unit {
                            Unit::Char(c, _) => out.push(*c),
                            Unit::Break => out.push('\n'),
                        }
                    }
                }
            }
            start = end;
        }
        out
    }

    /// Whether any character in `range` carries a mark.
    pub fn has_marks_in(&self, range: Range<StructuredPosition>) -> bool {
        let mut found = false;
        self.for_each_unit(|pos, unit| {
            if pos >= range.start.0 && pos < range.end.0 && unit.mark().is_some() {
                found = true;
            }
        });
        found
    }

    /// Apply an editing command and move the selection accordingly.
    pub fn apply(&mut self, cmd: &Cmd) -> Patch {
        let paragraphs_before = self.paragraphs.len();
        let cursor = match cmd {
            Cmd::InsertText { at, text } => self.insert_text(*at, text),
            Cmd::DeleteRange { range } => self.delete_range(range.clone()),
            Cmd::SplitParagraph { at } => self.split_paragraph(*at),
            Cmd::InsertHardBreak { at } => self.insert_hard_break(*at),
            Cmd::Paste { range, text } => {
                let at = self.delete_range(range.clone());
                self.insert_text(at, text)
            }
            Cmd::ResetFormatting { range } => {
                self.remove_marks(range.clone());
                range.end
            }
        };
        self.version += 1;
        self.selection = cursor..cursor;
        Patch {
            new_selection: self.selection.clone(),
            version: self.version,
            structural: cmd.is_structural() || self.paragraphs.len() != paragraphs_before,
        }
    }

    fn insert_text(&mut self, at: StructuredPosition, text: &str) -> StructuredPosition {
        let (mut p, mut u) = self.resolve(at);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.split_at(p, u);
                p += 1;
                u = 0;
            }
            let mark = self.inherited_mark(p, u);
            let units: Vec<Unit> = line.chars().map(|c| Unit::Char(c, mark.clone())).collect();
            let n = units.len();
            self.paragraphs[p].units.splice(u..u, units);
            u += n;
        }
        self.position_of(p, u)
    }

    fn delete_range(&mut self, range: Range<StructuredPosition>) -> StructuredPosition {
        let (a, b) = if range.start <= range.end {
            (range.start, range.end)
        } else {
            (range.end, range.start)
        };
        let (p1, u1) = self.resolve(a);
        let (p2, u2) = self.resolve(b);
        if p1 == p2 {
            self.paragraphs[p1].units.drain(u1..u2.max(u1));
        } else {
            let tail = self.paragraphs[p2].units.split_off(u2);
            let head = &mut self.paragraphs[p1].units;
            head.truncate(u1);
            head.extend(tail);
            self.paragraphs.drain(p1 + 1..=p2);
        }
        self.position_of(p1, u1)
    }

    fn split_paragraph(&mut self, at: StructuredPosition) -> StructuredPosition {
        let (p, u) = self.resolve(at);
        self.split_at(p, u);
        self.position_of(p + 1, 0)
    }

    fn insert_hard_break(&mut self, at: StructuredPosition) -> StructuredPosition {
        let (p, u) = self.resolve(at);
        self.paragraphs[p].units.insert(u, Unit::Break);
        self.position_of(p, u + 1)
    }

    fn split_at(&mut self, p: usize, u: usize) {
        let tail = self.paragraphs[p].units.split_off(u);
        self.paragraphs.insert(p + 1, Paragraph { units: tail });
    }

    /// Marks are not inclusive: text typed at the edge of a marked run stays
    /// unmarked, text typed strictly inside one joins it.
    fn inherited_mark(&self, p: usize, u: usize) -> Option<Rc<AnnotationMark>> {
        let units = &self.paragraphs[p].units;
        let left = u.checked_sub(1).and_then(|i| units.get(i)).and_then(Unit::mark)?;
        let right = units.get(u).and_then(Unit::mark)?;
        (left == right).then(|| Rc::clone(left))
    }

    /// Paragraph index and unit index for a position, clamped to the nearest
    /// valid insertion point.
    fn resolve(&self, pos: StructuredPosition) -> (usize, usize) {
        let mut start = 0;
        for (p, para) in self.paragraphs.iter().enumerate() {
            let content_start = start + 1;
            let len = para.units.len();
            if pos.0 <= content_start + len {
                return (p, pos.0.saturating_sub(content_start).min(len));
            }
            start += para.size();
        }
        let last = self.paragraphs.len() - 1;
        (last, self.paragraphs[last].units.len())
    }

    fn position_of(&self, p: usize, u: usize) -> StructuredPosition {
        let start: usize = self.paragraphs[..p].iter().map(Paragraph::size).sum();
        StructuredPosition(start + 1 + u)
    }

    fn for_each_unit(&self, mut f: impl FnMut(usize, &Unit)) {
        let mut start = 0;
        for para in &self.paragraphs {
            for (u, unit) in para.units.iter().enumerate() {
                f(start + 1 + u, unit);
            }
            start += para.size();
        }
    }

    fn set_marks(&mut self, range: Range<StructuredPosition>, mark: Option<Rc<AnnotationMark>>) {
        let mut start = 0;
        for para in &mut self.paragraphs {
            let size = para.units.len() + 2;
            for (u, unit) in para.units.iter_mut().enumerate() {
                let pos = start + 1 + u;
                if pos < range.start.0 || pos >= range.end.0 {
                    continue;
                }
                if let Unit::Char(_, slot) = unit {
                    *slot = mark.clone();
                }
            }
            start += size;
        }
    }
}

impl DocumentTree for Document {
    fn descendants(&self) -> Vec<NodeRef<'_>> {
        let mut nodes = Vec::new();
        let mut start = 0;
        for (index, para) in self.paragraphs.iter().enumerate() {
            nodes.push(NodeRef::Paragraph {
                pos: StructuredPosition(start),
                index,
            });

            let mut run: Option<(usize, String, Option<&AnnotationMark>)> = None;
            for (u, unit) in para.units.iter().enumerate() {
                let pos = start + 1 + u;
                match unit {
                    Unit::Char(c, mark) => {
                        let mark = mark.as_deref();
                        let extends = matches!(&run, Some((_, _, current)) if *current == mark);
                        if extends {
                            if let Some((_, text, _)) = run.as_mut() {
                                text.push(*c);
                            }
                        } else {
                            if let Some((at, text, mark)) = run.take() {
                                nodes.push(text_node(at, text, mark));
                            }
                            run = Some((pos, c.to_string(), mark));
                        }
                    }
                    Unit::Break => {
                        if let Some((at, text, mark)) = run.take() {
                            nodes.push(text_node(at, text, mark));
                        }
                        nodes.push(NodeRef::HardBreak {
                            pos: StructuredPosition(pos),
                        });
                    }
                }
            }
            if let Some((at, text, mark)) = run.take() {
                nodes.push(text_node(at, text, mark));
            }
            start += para.size();
        }
        nodes
    }

    fn content_size(&self) -> usize {
        self.paragraphs.iter().map(Paragraph::size).sum()
    }

    fn replace_content(&mut self, clean_text: &str) {
        self.paragraphs = clean_text.split('\n').map(Paragraph::from_line).collect();
        self.version += 1;
        self.selection = StructuredPosition(1)..StructuredPosition(1);
    }

    fn add_mark(&mut self, range: Range<StructuredPosition>, mark: AnnotationMark) {
        self.set_marks(range, Some(Rc::new(mark)));
        self.version += 1;
    }

    fn remove_marks(&mut self, range: Range<StructuredPosition>) {
        self.set_marks(range, None);
        self.version += 1;
    }

    fn selection(&self) -> Range<StructuredPosition> {
        self.selection.clone()
    }

    fn set_selection(&mut self, selection: Range<StructuredPosition>) {
        let size = self.content_size();
        let a = selection.start.0.min(size);
        let b = selection.end.0.min(size);
        self.selection = StructuredPosition(a.min(b))..StructuredPosition(a.max(b));
    }
}

fn text_node(at: usize, text: String, mark: Option<&AnnotationMark>) -> NodeRef<'_> {
    NodeRef::Text {
        pos: StructuredPosition(at),
        text,
        mark,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagSet;
    use pretty_assertions::assert_eq;

    fn pos(n: usize) -> StructuredPosition {
        StructuredPosition(n)
    }

    fn mark(index: usize) -> AnnotationMark {
        let span = AnnotationSpan::new("ab", 0..2, TagSet::from_codes(["n"]));
        AnnotationMark::for_span(index, &span)
    }

    #[test]
    fn empty_document_has_one_paragraph() {
        let doc = Document::new();
        assert_eq!(doc.content_size(), 2);
        assert_eq!(doc.plain_text(), "");
        assert_eq!(
            doc.descendants(),
            vec![NodeRef::Paragraph {
                pos: pos(0),
                index: 0
            }]
        );
    }

    #[test]
    fn paragraphs_follow_the_position_model() {
        let doc = Document::from_text("ab\ncd");
        assert_eq!(doc.content_size(), 8);
        assert_eq!(
            doc.descendants(),
            vec![
                NodeRef::Paragraph {
                    pos: pos(0),
                    index: 0
                },
                NodeRef::Text {
                    pos: pos(1),
                    text: "ab".into(),
                    mark: None
                },
                NodeRef::Paragraph {
                    pos: pos(4),
                    index: 1
                },
                NodeRef::Text {
                    pos: pos(5),
                    text: "cd".into(),
                    mark: None
                },
            ]
        );
    }

    #[test]
    fn text_runs_split_on_mark_changes() {
        let mut doc = Document::from_text("abcd");
        doc.add_mark(pos(2)..pos(4), mark(0));
        let texts: Vec<_> = doc
            .descendants()
            .into_iter()
            .filter_map(|n| match n {
                NodeRef::Text { text, mark, .. } => Some((text, mark.is_some())),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                ("a".to_string(), false),
                ("bc".to_string(), true),
                ("d".to_string(), false)
            ]
        );
    }

    #[test]
    fn typing_inside_a_mark_extends_it() {
        let mut doc = Document::from_text("abcd");
        doc.add_mark(pos(2)..pos(4), mark(0));
        doc.apply(&Cmd::InsertText {
            at: pos(3),
            text: "X".into(),
        });
        assert_eq!(doc.plain_text(), "abXcd");
        assert!(doc.has_marks_in(pos(3)..pos(4)));
    }

    #[test]
    fn typing_at_a_mark_edge_stays_unmarked() {
        let mut doc = Document::from_text("abcd");
        doc.add_mark(pos(2)..pos(4), mark(0));
        doc.apply(&Cmd::InsertText {
            at: pos(4),
            text: "X".into(),
        });
        assert_eq!(doc.plain_text(), "abcXd");
        assert!(!doc.has_marks_in(pos(4)..pos(5)));
    }

    #[test]
    fn split_and_merge_paragraphs() {
        let mut doc = Document::from_text("abcd");
        let patch = doc.apply(&Cmd::SplitParagraph { at: pos(3) });
        assert!(patch.structural);
        assert_eq!(doc.plain_text(), "ab\ncd");
        assert_eq!(patch.new_selection, pos(5)..pos(5));

        let patch = doc.apply(&Cmd::DeleteRange {
            range: pos(3)..pos(5),
        });
        assert!(patch.structural);
        assert_eq!(doc.plain_text(), "abcd");
        assert_eq!(doc.paragraph_count(), 1);
    }

    #[test]
    fn delete_inside_a_paragraph_is_not_structural() {
        let mut doc = Document::from_text("abcd");
        let patch = doc.apply(&Cmd::DeleteRange {
            range: pos(2)..pos(4),
        });
        assert!(!patch.structural);
        assert_eq!(doc.plain_text(), "ad");
        assert_eq!(patch.new_selection, pos(2)..pos(2));
    }

    #[test]
    fn hard_break_renders_as_newline() {
        let mut doc = Document::from_text("abcd");
        doc.apply(&Cmd::InsertHardBreak { at: pos(3) });
        assert_eq!(doc.plain_text(), "ab\ncd");
        assert_eq!(doc.paragraph_count(), 1);
        assert!(
            doc.descendants()
                .contains(&NodeRef::HardBreak { pos: pos(3) })
        );
    }

    #[test]
    fn multi_line_insert_creates_paragraphs() {
        let mut doc = Document::new();
        let patch = doc.apply(&Cmd::InsertText {
            at: pos(1),
            text: "ab\ncd".into(),
        });
        assert_eq!(doc.paragraph_count(), 2);
        assert_eq!(patch.new_selection, pos(7)..pos(7));
    }

    #[test]
    fn paste_replaces_the_range() {
        let mut doc = Document::from_text("abcd");
        doc.apply(&Cmd::Paste {
            range: pos(2)..pos(4),
            text: "XY".into(),
        });
        assert_eq!(doc.plain_text(), "aXYd");
    }

    #[test]
    fn reset_formatting_clears_marks() {
        let mut doc = Document::from_text("abcd");
        doc.add_mark(pos(1)..pos(5), mark(0));
        doc.apply(&Cmd::ResetFormatting {
            range: pos(2)..pos(3),
        });
        assert!(doc.has_marks_in(pos(1)..pos(2)));
        assert!(!doc.has_marks_in(pos(2)..pos(3)));
    }

    #[test]
    fn text_between_uses_block_separator() {
        let doc = Document::from_text("ab\ncd\nef");
        assert_eq!(doc.text_between(pos(2)..pos(6), "|"), "b|c");
    }

    #[test]
    fn selection_is_clamped_and_ordered() {
        let mut doc = Document::from_text("ab");
        doc.set_selection(pos(10)..pos(2));
        assert_eq!(doc.selection(), pos(2)..pos(4));
    }

    #[test]
    fn pending_mark_uses_labels() {
        let mark = AnnotationMark::pending(vec!["n".into(), "subj".into()], 2, 0);
        assert_eq!(mark.label, "Cущ,П");
        assert_eq!(mark.color, PENDING_COLOR);
    }

    #[test]
    fn adjacent_pending_marks_stay_separate_runs() {
        let mut doc = Document::from_text("我们学习");
        doc.add_mark(pos(1)..pos(3), AnnotationMark::pending(vec!["n".into()], 2, 0));
        doc.add_mark(pos(3)..pos(5), AnnotationMark::pending(vec!["n".into()], 2, 1));
        let runs: Vec<_> = doc
            .descendants()
            .into_iter()
            .filter_map(|node| match node {
                NodeRef::Text { text, mark: Some(_), .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(runs, vec!["我们".to_string(), "学习".to_string()]);
    }
}
