//! # Annotation Codec
//!
//! Converts between the inline notation (`漢字{{2,Cущ}}`) and a
//! [`FlatDocument`](crate::models::FlatDocument) of clean text plus spans.
//!
//! ## Modules
//!
//! - **`marker`**: `Marker` owns the `{{`, `}}` and `,` delimiters
//! - **`cursor`**: `Cursor` for char-by-char scanning with byte positions
//! - **`parser`**: `parse()`; best effort, never fails
//! - **`serialize`**: `serialize()`; splices markers into a rope buffer
//! - **`invariants`**: structural checks used by tests
//!
//! ## Notation
//!
//! Markers are postfix: they tag the `count` characters of clean text right
//! before them (one when omitted). Tokens inside a marker are tag codes or
//! labels. Offsets everywhere are in characters, not bytes.

pub mod cursor;
pub mod invariants;
pub mod marker;
pub mod parser;
pub mod serialize;

pub use marker::Marker;
pub use parser::parse;
pub use serialize::{serialize, serialize_document};
