//! Tag legality for a selection.
//!
//! Everything here works on flat offsets over a [`FlatDocument`]. A
//! selection is either disabled as a whole or ready; per-tag state only
//! distinguishes tags already on the exactly-matching span.

use std::ops::Range;

use thiserror::Error;

use crate::models::{FlatDocument, Overlap, Placement, TagSet, overlap, tag};
use crate::script;

/// How an existing span relates to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanRelation {
    ExactMatch,
    /// The span sits inside the selection without matching it ("nested").
    FullyContained,
    PartialOverlap,
}

impl SpanRelation {
    pub fn is_conflict(self) -> bool {
        self != SpanRelation::ExactMatch
    }
}

/// Relation of one span to the selection; `None` when they are disjoint.
pub fn classify(span: &Range<usize>, selection: &Range<usize>) -> Option<SpanRelation> {
    match overlap(span, selection) {
        Overlap::Disjoint => None,
        Overlap::Exact => Some(SpanRelation::ExactMatch),
        Overlap::Inside => Some(SpanRelation::FullyContained),
        Overlap::Partial => Some(SpanRelation::PartialOverlap),
    }
}

/// Why no tag can be toggled on a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DisabledReason {
    #[error("nothing is selected")]
    Empty,
    #[error("selection is outside the document")]
    OutOfBounds,
    #[error("selection contains characters other than ideographs")]
    NotPureScript,
    #[error("selection conflicts with annotation #{span_index} ({relation:?})")]
    Conflict {
        span_index: usize,
        relation: SpanRelation,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Disabled(DisabledReason),
    /// Tags may be toggled. `exact` is the span whose bounds equal the
    /// selection, if any.
    Ready { exact: Option<usize> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagState {
    Disabled,
    /// Toggling adds the tag.
    Active,
    /// The exact span carries the tag; toggling removes it.
    Checked,
}

/// Effect of a successful toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagChange {
    /// A new span was created for the selection.
    Created,
    /// The tag joined the span at `index`.
    Added { index: usize },
    /// The tag left the span at `index`, which still has others.
    Removed { index: usize },
    /// The last tag was removed and the span deleted.
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error(transparent)]
    Disabled(#[from] DisabledReason),
    #[error("unknown tag code: {0}")]
    UnknownTag(String),
}

/// Computes the legality of tagging `selection`.
pub fn evaluate(doc: &FlatDocument, selection: Range<usize>) -> SelectionState {
    if selection.start >= selection.end {
        return SelectionState::Disabled(DisabledReason::Empty);
    }
    if selection.end > doc.char_len() {
        return SelectionState::Disabled(DisabledReason::OutOfBounds);
    }
    if !script::is_pure_script(doc.text_in(selection.clone())) {
        return SelectionState::Disabled(DisabledReason::NotPureScript);
    }

    let mut exact = None;
    for (span_index, span) in doc.spans.iter().enumerate() {
        match classify(&span.range(), &selection) {
            None => {}
            Some(SpanRelation::ExactMatch) => exact = Some(span_index),
            Some(relation) => {
                return SelectionState::Disabled(DisabledReason::Conflict {
                    span_index,
                    relation,
                });
            }
        }
    }
    SelectionState::Ready { exact }
}

pub fn tag_state(doc: &FlatDocument, selection: Range<usize>, code: &str) -> TagState {
    state_for(doc, &evaluate(doc, selection), code)
}

/// State of every registered tag, in registry order.
pub fn toolbar(doc: &FlatDocument, selection: Range<usize>) -> Vec<(&'static str, TagState)> {
    let state = evaluate(doc, selection);
    tag::all_codes()
        .map(|code| (code, state_for(doc, &state, code)))
        .collect()
}

fn state_for(doc: &FlatDocument, state: &SelectionState, code: &str) -> TagState {
    match *state {
        SelectionState::Disabled(_) => TagState::Disabled,
        SelectionState::Ready { exact: Some(i) } if doc.spans[i].tags.contains(code) => {
            TagState::Checked
        }
        SelectionState::Ready { .. } => TagState::Active,
    }
}

/// Adds or removes `code` on the selection.
///
/// Toggling the same tag twice leaves the span set as it was.
pub fn toggle_tag(
    doc: &mut FlatDocument,
    selection: Range<usize>,
    code: &str,
) -> Result<TagChange, Refusal> {
    if tag::lookup(code).is_none() {
        return Err(Refusal::UnknownTag(code.to_string()));
    }
    let exact = match evaluate(doc, selection.clone()) {
        SelectionState::Disabled(reason) => return Err(reason.into()),
        SelectionState::Ready { exact } => exact,
    };

    let Some(index) = exact else {
        return match doc.place(selection.clone(), TagSet::from_codes([code])) {
            Some(Placement::Added) => Ok(TagChange::Created),
            Some(Placement::Merged { index }) => Ok(TagChange::Added { index }),
            Some(Placement::Rejected { index, overlap }) => {
                log::warn!("toggle on {selection:?} rejected by span #{index} ({overlap:?})");
                Err(DisabledReason::Conflict {
                    span_index: index,
                    relation: SpanRelation::PartialOverlap,
                }
                .into())
            }
            None => Err(DisabledReason::Empty.into()),
        };
    };

    let tags = &mut doc.spans[index].tags;
    if tags.remove(code) {
        if tags.is_empty() {
            doc.spans.remove(index);
            Ok(TagChange::Deleted)
        } else {
            Ok(TagChange::Removed { index })
        }
    } else {
        tags.insert(code);
        Ok(TagChange::Added { index })
    }
}
