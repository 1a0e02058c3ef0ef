pub mod editing;
pub mod io;
pub mod models;
pub mod parsing;
pub mod script;


// Re-export key types for easier usage
pub use editing::{annotator::*, commands::*, tree::*};
pub use io::*;
pub use models::{span::*, tag::TagDescriptor};
pub use parsing::{parse, serialize, serialize_document};
