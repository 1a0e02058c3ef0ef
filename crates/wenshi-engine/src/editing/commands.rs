use std::ops::Range;

use crate::editing::tree::StructuredPosition;

/// User-level edits on the structured document.
///
/// Positions are structured positions; text is inserted as given (paste
/// cleaning happens before a `Paste` is built).
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Insert text at a position. `\n` splits the paragraph.
    InsertText { at: StructuredPosition, text: String },
    /// Delete everything in the range, merging paragraphs it spans.
    DeleteRange { range: Range<StructuredPosition> },
    /// Split the paragraph at a position (Enter).
    SplitParagraph { at: StructuredPosition },
    /// Insert a hard line break (Shift+Enter).
    InsertHardBreak { at: StructuredPosition },
    /// Replace the range with already-cleaned clipboard text.
    Paste {
        range: Range<StructuredPosition>,
        text: String,
    },
    /// Strip every annotation mark in the range.
    ResetFormatting { range: Range<StructuredPosition> },
}

impl Cmd {
    /// Whether this edit always needs a rebuild of the annotation marks.
    ///
    /// Plain typing and deletions inside a paragraph keep marks consistent
    /// on their own; `Document::apply` also flags deletions and insertions
    /// that change the paragraph structure.
    pub fn is_structural(&self) -> bool {
        match self {
            Cmd::InsertText { text, .. } => text.contains('\n'),
            Cmd::DeleteRange { .. } => false,
            Cmd::SplitParagraph { .. }
            | Cmd::InsertHardBreak { .. }
            | Cmd::Paste { .. }
            | Cmd::ResetFormatting { .. } => true,
        }
    }
}
