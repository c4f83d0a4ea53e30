//! Storage seams the pipeline depends on.
//!
//! `DocumentStore` abstracts where source transcripts come from and
//! `TitleStore` abstracts the relational episode-title table, so tests and
//! alternative backends can stand in without touching the pipeline code.

use crate::types::{EpisodeTitleRow, SourceDocument};

/// Read-only source of transcript documents, grouped into collections.
pub trait DocumentStore: Send + Sync {
    /// Collection ids in a stable order.
    fn list_collections(&self) -> anyhow::Result<Vec<String>>;

    /// Documents of one collection, optionally capped at `limit`.
    fn get_documents(
        &self,
        collection: &str,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<SourceDocument>>;
}

/// Relational episode-title table keyed by (podcast_id, episode_id).
pub trait TitleStore: Send + Sync {
    /// Insert or replace the title for an episode.
    fn upsert_episode(&self, podcast_id: i64, episode_id: i64, title: &str) -> anyhow::Result<()>;

    /// All rows, for normalization passes.
    fn list_episodes(&self) -> anyhow::Result<Vec<EpisodeTitleRow>>;

    /// Rewrite the stored title for one episode.
    fn update_title(&self, podcast_id: i64, episode_id: i64, title: &str) -> anyhow::Result<()>;
}
