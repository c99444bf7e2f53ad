//! Text extraction and chunking stage functions

mod chunker;
mod parser;

pub use chunker::TextChunker;
pub use parser::{combine_pages, PdfParser, TextExtractor, PLACEHOLDER_TEXT};
