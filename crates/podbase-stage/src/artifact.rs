//! Stage artifact formats and the filename convention joining them.
//!
//! One JSON file per document and stage: stage3 holds tagged chunks,
//! stage4 the same chunks with embeddings attached. The stage4 name is
//! derived from the stage3 name by a fixed suffix swap; that derivation is
//! load-bearing for the synchronizer, so it lives here as a plain function
//! instead of inline string edits.

use anyhow::Context;
use podbase_core::types::{Chunk, EpisodeMeta};
use podbase_text::titles::normalize_title;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const STAGE3_SUFFIX: &str = "_tagged.json";
pub const STAGE4_SUFFIX: &str = "_embedded.json";

/// Stage4 counterpart of a stage3 file name, `None` when the name does not
/// follow the stage3 convention.
pub fn stage4_file_name(stage3_name: &str) -> Option<String> {
    stage3_name
        .strip_suffix(STAGE3_SUFFIX)
        .map(|stem| format!("{stem}{STAGE4_SUFFIX}"))
}

/// Inverse of [`stage4_file_name`].
pub fn stage3_file_name(stage4_name: &str) -> Option<String> {
    stage4_name
        .strip_suffix(STAGE4_SUFFIX)
        .map(|stem| format!("{stem}{STAGE3_SUFFIX}"))
}

/// File stem for a document's artifacts: the normalized episode title,
/// falling back to the document id for untitled documents. Always already
/// normalized, so a title pass over fresh artifacts is a no-op.
pub fn artifact_stem(document_id: &str, episode_title: &str) -> String {
    let base = if episode_title.trim().is_empty() {
        document_id
    } else {
        episode_title
    };
    let mut stem = normalize_title(base);
    if stem.is_empty() {
        stem = normalize_title(document_id);
    }
    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    stem
}

/// One chunk as serialized into a stage3 artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedChunk {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub chunk_text: String,
    pub episode_id: i64,
    pub podcast_id: i64,
    pub podcast_name: String,
    pub author: String,
    pub category: String,
    pub episode_title: String,
    pub duration: String,
    pub published_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apple_rating: Option<f64>,
    #[serde(default)]
    pub enhanced_tags: Vec<String>,
}

impl TaggedChunk {
    pub fn from_chunk(chunk: &Chunk, tags: Vec<String>) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            chunk_index: chunk.chunk_index,
            chunk_text: chunk.chunk_text.clone(),
            episode_id: chunk.meta.episode_id,
            podcast_id: chunk.meta.podcast_id,
            podcast_name: chunk.meta.podcast_name.clone(),
            author: chunk.meta.author.clone(),
            category: chunk.meta.category.clone(),
            episode_title: chunk.meta.episode_title.clone(),
            duration: chunk.meta.duration.clone(),
            published_date: chunk.meta.published_date.clone(),
            apple_rating: chunk.meta.apple_rating,
            enhanced_tags: tags,
        }
    }

    pub fn meta(&self, language: Option<String>) -> EpisodeMeta {
        EpisodeMeta {
            episode_id: self.episode_id,
            podcast_id: self.podcast_id,
            podcast_name: self.podcast_name.clone(),
            author: self.author.clone(),
            category: self.category.clone(),
            episode_title: self.episode_title.clone(),
            duration: self.duration.clone(),
            published_date: self.published_date.clone(),
            language,
            apple_rating: self.apple_rating,
        }
    }
}

/// Stage4 shape: the stage3 fields plus embedding and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub chunk_text: String,
    pub episode_id: i64,
    pub podcast_id: i64,
    pub podcast_name: String,
    pub author: String,
    pub category: String,
    pub episode_title: String,
    pub duration: String,
    pub published_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apple_rating: Option<f64>,
    #[serde(default)]
    pub enhanced_tags: Vec<String>,
    pub embedding: Vec<f32>,
    pub language: String,
    pub created_at: String,
    pub source_model: String,
}

impl EmbeddedChunk {
    pub fn from_tagged(
        tagged: &TaggedChunk,
        embedding: Vec<f32>,
        language: String,
        created_at: String,
        source_model: String,
    ) -> Self {
        Self {
            chunk_id: tagged.chunk_id.clone(),
            chunk_index: tagged.chunk_index,
            chunk_text: tagged.chunk_text.clone(),
            episode_id: tagged.episode_id,
            podcast_id: tagged.podcast_id,
            podcast_name: tagged.podcast_name.clone(),
            author: tagged.author.clone(),
            category: tagged.category.clone(),
            episode_title: tagged.episode_title.clone(),
            duration: tagged.duration.clone(),
            published_date: tagged.published_date.clone(),
            apple_rating: tagged.apple_rating,
            enhanced_tags: tagged.enhanced_tags.clone(),
            embedding,
            language,
            created_at,
            source_model,
        }
    }
}

/// Top-level artifact shape shared by both stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFile<T> {
    pub chunks: Vec<T>,
}

#[derive(Serialize)]
struct ChunkFileRef<'a, T> {
    chunks: &'a [T],
}

fn write_artifact<T: Serialize>(
    dir: &Path,
    file_name: &str,
    chunks: &[T],
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create stage dir {}", dir.display()))?;
    let path = dir.join(file_name);
    let raw = serde_json::to_string_pretty(&ChunkFileRef { chunks })?;
    std::fs::write(&path, raw)
        .with_context(|| format!("failed to write artifact {}", path.display()))?;
    Ok(path)
}

pub fn write_stage3(dir: &Path, stem: &str, chunks: &[TaggedChunk]) -> anyhow::Result<PathBuf> {
    write_artifact(dir, &format!("{stem}{STAGE3_SUFFIX}"), chunks)
}

pub fn write_stage4(dir: &Path, stem: &str, chunks: &[EmbeddedChunk]) -> anyhow::Result<PathBuf> {
    write_artifact(dir, &format!("{stem}{STAGE4_SUFFIX}"), chunks)
}

pub fn read_stage3(path: &Path) -> anyhow::Result<ChunkFile<TaggedChunk>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read artifact {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid artifact {}", path.display()))
}

pub fn read_stage4(path: &Path) -> anyhow::Result<ChunkFile<EmbeddedChunk>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read artifact {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid artifact {}", path.display()))
}
