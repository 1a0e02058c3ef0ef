//! Flat offsets <-> structured positions.
//!
//! Flat offsets index the clean text the codec works on, where every
//! paragraph after the first is preceded by one `\n` and hard breaks are a
//! `\n` of their own. The map is rebuilt from the tree whenever it is needed;
//! it is never patched incrementally.

use std::ops::Range;

use crate::editing::tree::{DocumentTree, NodeRef, StructuredPosition};
use crate::models::{FlatDocument, Placement, TagSet};

/// What a flat offset stands for in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Char,
    /// The synthetic `\n` between two paragraphs. Maps to the end of the
    /// previous paragraph's content.
    ParagraphBreak,
    HardBreak,
}

/// Forward table from flat offset to structured position.
///
/// Positions are strictly increasing, so the reverse direction is a binary
/// search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffsetMap {
    forward: Vec<(StructuredPosition, Slot)>,
}

impl OffsetMap {
    pub fn build<T: DocumentTree + ?Sized>(tree: &T) -> Self {
        let mut forward = Vec::new();
        walk(tree, |pos, slot| forward.push((pos, slot)));
        Self { forward }
    }

    /// Number of flat offsets (the clean text length in characters).
    pub fn flat_len(&self) -> usize {
        self.forward.len()
    }

    pub fn slot(&self, offset: usize) -> Option<Slot> {
        self.forward.get(offset).map(|(_, slot)| *slot)
    }

    /// Structured position of the character at `offset`.
    ///
    /// `None` when the offset is past the end of the text.
    pub fn to_structured(&self, offset: usize) -> Option<StructuredPosition> {
        self.forward.get(offset).map(|(pos, _)| *pos)
    }

    /// Flat offset for a structured position.
    ///
    /// A position right after a character maps to the following offset, so
    /// selection ends convert naturally. So does the inside of an empty
    /// paragraph. Positions before any text map to `None`.
    pub fn to_flat(&self, pos: StructuredPosition) -> Option<usize> {
        match self.forward.binary_search_by_key(&pos, |(p, _)| *p) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => {
                let (prev, slot) = self.forward[i - 1];
                let after = match slot {
                    // Skip the closing and opening tokens.
                    Slot::ParagraphBreak => prev.offset(2),
                    Slot::Char | Slot::HardBreak => prev.offset(1),
                };
                (after == pos || prev.offset(1) == pos).then_some(i)
            }
        }
    }

    /// Cursor position in front of flat `offset`; `offset == flat_len()`
    /// gives the end of the document.
    pub fn cursor_position(&self, offset: usize) -> Option<StructuredPosition> {
        if offset < self.forward.len() {
            return self.to_structured(offset);
        }
        if offset > self.forward.len() {
            return None;
        }
        let (last, slot) = *self.forward.last()?;
        Some(match slot {
            Slot::ParagraphBreak => last.offset(2),
            Slot::Char | Slot::HardBreak => last.offset(1),
        })
    }

    /// Structured range covering the flat range `[start, end)`: from the
    /// position of `start` to just after the character at `end - 1`.
    pub fn structured_range(&self, range: Range<usize>) -> Option<Range<StructuredPosition>> {
        if range.start >= range.end {
            return None;
        }
        let from = self.to_structured(range.start)?;
        let last = self.to_structured(range.end - 1)?;
        Some(from..last.offset(1))
    }

    /// Flat range for a structured selection. Both ends must map.
    pub fn to_flat_range(&self, range: Range<StructuredPosition>) -> Option<Range<usize>> {
        let start = self.to_flat(range.start)?;
        let end = self.to_flat(range.end)?;
        Some(start.min(end)..start.max(end))
    }
}

/// Reads the clean text and annotation spans out of a tree.
///
/// Each maximal run of characters carrying the same mark becomes one span.
/// Runs are disjoint by construction; marks with no tags are ignored.
pub fn extract<T: DocumentTree + ?Sized>(tree: &T) -> FlatDocument {
    let mut clean_text = String::new();
    let mut runs: Vec<(Range<usize>, Vec<String>)> = Vec::new();
    let mut offset = 0;

    for node in tree.descendants() {
        match node {
            NodeRef::Paragraph { index, .. } => {
                if index > 0 {
                    clean_text.push('\n');
                    offset += 1;
                }
            }
            NodeRef::Text { text, mark, .. } => {
                let len = text.chars().count();
                if let Some(mark) = mark {
                    runs.push((offset..offset + len, mark.tags.clone()));
                }
                clean_text.push_str(&text);
                offset += len;
            }
            NodeRef::HardBreak { .. } => {
                clean_text.push('\n');
                offset += 1;
            }
        }
    }

    let mut doc = FlatDocument::new(clean_text);
    for (range, tags) in runs {
        if let Some(Placement::Rejected { index, overlap }) =
            doc.place(range.clone(), TagSet::from_codes(tags))
        {
            log::warn!("extracted run {range:?} conflicts with span #{index} ({overlap:?})");
        }
    }
    doc
}

/// Visits every flat offset in order with its structured position.
fn walk<T, F>(tree: &T, mut visit: F)
where
    T: DocumentTree + ?Sized,
    F: FnMut(StructuredPosition, Slot),
{
    let mut seen_paragraph = false;
    for node in tree.descendants() {
        match node {
            NodeRef::Paragraph { pos, .. } => {
                if seen_paragraph {
                    // End of the previous paragraph's content: just before
                    // its closing token.
                    visit(StructuredPosition(pos.get() - 1), Slot::ParagraphBreak);
                }
                seen_paragraph = true;
            }
            NodeRef::Text { pos, text, .. } => {
                for i in 0..text.chars().count() {
                    visit(pos.offset(i), Slot::Char);
                }
            }
            NodeRef::HardBreak { pos } => visit(pos, Slot::HardBreak),
        }
    }
}
