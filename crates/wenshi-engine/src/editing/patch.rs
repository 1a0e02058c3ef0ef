use std::ops::Range;

use crate::editing::tree::StructuredPosition;

/// Result of applying a command
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub new_selection: Range<StructuredPosition>,
    pub version: u64,
    /// True when the paragraph structure changed or the command always
    /// requires a rebuild.
    pub structural: bool,
}
