/*!
 * # Editing Core
 *
 * The structured side of the engine: a paragraph tree the user edits, and
 * the machinery that keeps its annotation marks consistent with the inline
 * notation.
 *
 * ## Architecture Overview
 *
 * ### 1. Flat text is the source of truth
 * - What gets saved is always `serialize(extract(tree))`
 * - After structural edits, paste and undo/redo the tree is rebuilt from
 *   that string, so marks never drift from the notation
 *
 * ### 2. Command-based editing
 * - Edits are `Cmd` values applied to the `Document`, returning a `Patch`
 * - The `Annotator` records an undo snapshot before every edit
 *
 * ### 3. Offsets are mapped, never patched
 * - `OffsetMap` is rebuilt from the tree whenever flat offsets are needed
 * - Spans that do not map are skipped with a warning
 *
 * ### 4. All-or-nothing tag legality
 * - `selection` decides whether a selection can be tagged at all, then which
 *   tags are already on it
 *
 * ## Module Structure
 *
 * - **`tree`**: `DocumentTree` trait, in-memory `Document`, `AnnotationMark`
 * - **`commands`**: `Cmd` enum for every edit
 * - **`patch`**: edit result with the new selection
 * - **`offset_map`**: flat offset <-> structured position, and `extract`
 * - **`selection`**: tag state machine over flat offsets
 * - **`history`**: snapshot undo/redo
 * - **`clipboard`**: plain-text copy and paste cleaning
 * - **`annotator`**: the two-phase orchestrator tying it together
 *
 * ## Usage Pattern
 *
 * ```rust
 * use wenshi_engine::editing::*;
 *
 * let mut annotator = Annotator::with_content("我们学习中文");
 * annotator.set_selection(StructuredPosition(3)..StructuredPosition(5));
 * annotator.toggle_tag("v").unwrap();
 * annotator.run_pending();
 * assert_eq!(annotator.content(), "我们学习{{2,Гл}}中文");
 * ```
 */

pub mod annotator;
pub mod clipboard;
pub mod commands;
pub mod history;
pub mod offset_map;
pub mod patch;
pub mod selection;
pub mod tree;

pub use annotator::{Annotator, Notification, Task};
pub use commands::Cmd;
pub use history::History;
pub use offset_map::{OffsetMap, Slot, extract};
pub use patch::Patch;
pub use selection::{
    DisabledReason, Refusal, SelectionState, SpanRelation, TagChange, TagState,
};
pub use tree::{AnnotationMark, Document, DocumentTree, NodeRef, StructuredPosition};
