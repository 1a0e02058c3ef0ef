pub mod span;
pub mod tag;

pub use span::{AnnotationSpan, FlatDocument, Overlap, Placement, TagSet, overlap};
pub use tag::{PALETTE, TAGS, TagDescriptor, TagGroup};
