//! Expected-structure side: markup parsing and style inference.

mod infer;
mod parser;

pub use infer::{infer_styles, StyleFramework};
pub use parser::{parse_markup, MAX_MARKUP_DEPTH, TEXT_CONTENT_LIMIT};
