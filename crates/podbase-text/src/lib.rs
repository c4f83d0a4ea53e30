//! podbase-text
//!
//! Text-side stages of the pipeline: sentence-boundary chunking with
//! sliding-window overlap, tiered tag extraction against a keyword taxonomy,
//! and episode-title normalization.

pub mod chunker;
pub mod tags;
pub mod titles;

pub use chunker::TextChunker;
pub use tags::TagExtractor;
pub use titles::normalize_title;
