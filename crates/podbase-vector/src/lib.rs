//! podbase-vector
//!
//! LanceDB persistence for chunk records: idempotent collection creation,
//! deduplicating batch writes keyed on `chunk_id`, and a small search API
//! for verifying ingested data.

pub mod schema;
pub mod search;
pub mod store;
pub mod writer;

pub use search::{ChunkSearchResult, VectorSearch};
pub use writer::{VectorStoreWriter, WriteReport};
