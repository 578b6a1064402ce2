pub mod composer;
pub mod extractor;

pub use composer::{to_quoted_printable, EmailComposer};
pub use extractor::{extract_updates, parse_link_line, LINK_MARKER};
