//! podbase-stage
//!
//! Intermediate-artifact management: the stage3/stage4 JSON formats and
//! their naming convention, a synchronizer that reconciles the two stage
//! directories, the SQLite episode-title table, and the coordinated title
//! normalization pass over all three title stores.

pub mod artifact;
pub mod sync;
pub mod title_store;
pub mod titles_pass;

pub use artifact::{
    artifact_stem, read_stage3, read_stage4, stage3_file_name, stage4_file_name, write_stage3,
    write_stage4, ChunkFile, EmbeddedChunk, TaggedChunk, STAGE3_SUFFIX, STAGE4_SUFFIX,
};
pub use sync::{StageSynchronizer, SyncDiff};
pub use title_store::SqliteTitleStore;
pub use titles_pass::{run_titles_pass, TitlesPassReport};
