//! # Annotator
//!
//! Owns the structured [`Document`] and keeps its marks in step with the
//! inline notation.
//!
//! Edits run in two phases. Phase 1 mutates the tree directly (typing,
//! deleting, toggling a tag) and records an undo snapshot. Edits that can
//! leave marks inconsistent queue a [`Task::Rebuild`]; phase 2 runs when the
//! host calls [`Annotator::run_pending`]. A rebuild serializes the current
//! tree, parses the result and reapplies every span with fresh indices and
//! colours, so the marks on screen always match what would be saved.
//!
//! While a rebuild runs, change notifications and new tasks are suppressed.

use std::cell::Cell;
use std::collections::VecDeque;
use std::ops::Range;

use crate::editing::clipboard;
use crate::editing::commands::Cmd;
use crate::editing::history::History;
use crate::editing::offset_map::{OffsetMap, extract};
use crate::editing::patch::Patch;
use crate::editing::selection::{
    self, DisabledReason, Refusal, SelectionState, TagChange, TagState,
};
use crate::editing::tree::{AnnotationMark, Document, DocumentTree, StructuredPosition};
use crate::models::FlatDocument;
use crate::parsing;

/// Deferred work, drained by [`Annotator::run_pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Rebuild { preserve_selection: bool },
}

/// Events for the host, drained by [`Annotator::take_notifications`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The serialized content after a user-visible change.
    ContentChanged(String),
    /// A rebuild finished; `skipped` spans could not be mapped.
    Rebuilt { applied: usize, skipped: usize },
}

/// Holds the rebuild flag for as long as it lives.
struct RebuildGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> RebuildGuard<'a> {
    /// `None` if a rebuild is already running.
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for RebuildGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

#[derive(Debug, Default)]
pub struct Annotator {
    tree: Document,
    history: History<Document>,
    tasks: VecDeque<Task>,
    rebuilding: Cell<bool>,
    notifications: Vec<Notification>,
    /// Serial for the next provisional mark.
    pending_marks: usize,
}

impl Annotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(raw: &str) -> Self {
        let mut annotator = Self::new();
        annotator.set_content(raw);
        annotator
    }

    pub fn document(&self) -> &Document {
        &self.tree
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.get()
    }

    /// The document in inline notation.
    pub fn content(&self) -> String {
        parsing::serialize_document(&self.flat_document())
    }

    pub fn flat_document(&self) -> FlatDocument {
        extract(&self.tree)
    }

    /// Loads annotated text, dropping history and pending work.
    pub fn set_content(&mut self, raw: &str) {
        self.history.clear();
        self.tasks.clear();
        self.rebuild(raw, false);
    }

    pub fn selection(&self) -> Range<StructuredPosition> {
        self.tree.selection()
    }

    pub fn set_selection(&mut self, selection: Range<StructuredPosition>) {
        self.tree.set_selection(selection);
    }

    /// The selection in flat offsets, if it maps.
    pub fn flat_selection(&self) -> Option<Range<usize>> {
        OffsetMap::build(&self.tree).to_flat_range(self.tree.selection())
    }

    /// Phase 1 of an edit. Structural edits queue a rebuild.
    pub fn apply_edit(&mut self, cmd: Cmd) -> Patch {
        self.history.record(self.tree.clone());
        let patch = self.tree.apply(&cmd);
        log::debug!("applied {cmd:?} -> version {}", patch.version);
        self.notify_change();
        if patch.structural {
            self.schedule(Task::Rebuild {
                preserve_selection: true,
            });
        }
        patch
    }

    /// Plain text of the selection.
    pub fn copy(&self) -> String {
        clipboard::copy_text(&self.tree, self.tree.selection())
    }

    /// Copies the selection and deletes it.
    pub fn cut(&mut self) -> String {
        let text = self.copy();
        let range = self.tree.selection();
        if range.start < range.end {
            self.apply_edit(Cmd::DeleteRange { range });
        }
        text
    }

    /// Inserts cleaned clipboard text over the selection. Nothing happens
    /// when cleaning leaves no text.
    pub fn paste(&mut self, text: &str) -> Option<Patch> {
        let cleaned = clipboard::clean_pasted_text(text);
        if cleaned.is_empty() {
            return None;
        }
        Some(self.apply_edit(Cmd::Paste {
            range: self.tree.selection(),
            text: cleaned,
        }))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.tree.clone()) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.tree.clone()) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: Document) {
        self.tree = snapshot;
        self.notify_change();
        self.schedule(Task::Rebuild {
            preserve_selection: true,
        });
    }

    pub fn selection_state(&self) -> SelectionState {
        match self.flat_selection() {
            Some(range) => selection::evaluate(&self.flat_document(), range),
            None => SelectionState::Disabled(DisabledReason::Empty),
        }
    }

    /// State of every tag for the current selection.
    pub fn toolbar(&self) -> Vec<(&'static str, TagState)> {
        let range = self.flat_selection().unwrap_or(0..0);
        selection::toolbar(&self.flat_document(), range)
    }

    /// Toggles `code` on the current selection.
    ///
    /// The tree gets a provisional mark right away; the queued rebuild gives
    /// it its final index and colour.
    pub fn toggle_tag(&mut self, code: &str) -> Result<TagChange, Refusal> {
        let map = OffsetMap::build(&self.tree);
        let range = map
            .to_flat_range(self.tree.selection())
            .ok_or(Refusal::Disabled(DisabledReason::Empty))?;
        let structured = map
            .structured_range(range.clone())
            .ok_or(Refusal::Disabled(DisabledReason::Empty))?;

        let mut flat = extract(&self.tree);
        let change = selection::toggle_tag(&mut flat, range.clone(), code)?;
        log::debug!("toggle {code} on {range:?}: {change:?}");

        self.history.record(self.tree.clone());
        match flat.exact_span(&range) {
            Some(index) => {
                let tags = flat.spans[index].tags.to_vec();
                let serial = self.pending_marks;
                self.pending_marks += 1;
                self.tree.add_mark(
                    structured,
                    AnnotationMark::pending(tags, range.len(), serial),
                );
            }
            None => self.tree.remove_marks(structured),
        }
        self.notify_change();
        self.schedule(Task::Rebuild {
            preserve_selection: true,
        });
        Ok(change)
    }

    /// Whether the selection covers any annotated text.
    pub fn has_formatting(&self) -> bool {
        let range = self.tree.selection();
        range.start < range.end && self.tree.has_marks_in(range)
    }

    /// Removes every annotation under the selection.
    pub fn reset_formatting(&mut self) -> bool {
        if !self.has_formatting() {
            return false;
        }
        let range = self.tree.selection();
        self.apply_edit(Cmd::ResetFormatting {
            range: range.clone(),
        });
        self.tree.set_selection(range);
        true
    }

    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Runs queued tasks to completion. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.tasks.pop_front() {
            match task {
                Task::Rebuild { preserve_selection } => {
                    let raw = self.content();
                    self.rebuild(&raw, preserve_selection);
                }
            }
            ran += 1;
        }
        ran
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn schedule(&mut self, task: Task) {
        if self.rebuilding.get() {
            log::debug!("dropping {task:?} scheduled during rebuild");
            return;
        }
        let Task::Rebuild { preserve_selection } = task;
        let queued = self.tasks.iter_mut().find_map(|t| match t {
            Task::Rebuild { preserve_selection } => Some(preserve_selection),
        });
        match queued {
            Some(flag) => *flag |= preserve_selection,
            None => self.tasks.push_back(task),
        }
    }

    fn notify_change(&mut self) {
        if self.rebuilding.get() {
            return;
        }
        let content = self.content();
        self.notifications.push(Notification::ContentChanged(content));
    }

    /// Replaces the tree with `raw` and reapplies its spans as marks.
    fn rebuild(&mut self, raw: &str, preserve_selection: bool) {
        let Some(_guard) = RebuildGuard::enter(&self.rebuilding) else {
            log::warn!("rebuild requested while another is running; ignored");
            return;
        };

        let saved = if preserve_selection {
            OffsetMap::build(&self.tree).to_flat_range(self.tree.selection())
        } else {
            None
        };

        let doc = parsing::parse(raw);
        self.tree.replace_content(&doc.clean_text);
        let map = OffsetMap::build(&self.tree);

        let (mut applied, mut skipped) = (0, 0);
        for (index, span) in doc.spans.iter().enumerate() {
            match map.structured_range(span.range()) {
                Some(range) => {
                    self.tree.add_mark(range, AnnotationMark::for_span(index, span));
                    applied += 1;
                }
                None => {
                    log::warn!("span #{index} at {:?} does not map; skipped", span.range());
                    skipped += 1;
                }
            }
        }

        let restored = saved.and_then(|range| {
            Some(map.cursor_position(range.start)?..map.cursor_position(range.end)?)
        });
        if let Some(selection) = restored {
            self.tree.set_selection(selection);
        }

        log::debug!("rebuilt {applied} annotations, {skipped} skipped");
        self.notifications
            .push(Notification::Rebuilt { applied, skipped });
    }
}
