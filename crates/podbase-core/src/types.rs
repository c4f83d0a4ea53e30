//! Domain types shared by the chunking, tagging, embedding and ingestion crates.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub type ChunkId = String;
pub type EmbeddingVector = Vec<f32>;

/// Number of tag-vector slots every vector record carries. Records with fewer
/// tags pad the remaining slots by repeating the text embedding.
pub const TAG_SLOTS: usize = 3;

/// Maximum number of category tags attached to a chunk.
pub const MAX_TAGS: usize = 3;

/// One podcast episode transcript as pulled from the source document store.
///
/// Source documents come from an external store whose records carry
/// heterogeneous optional fields; everything except `id` is default-filled at
/// the deserialization boundary so the rest of the pipeline never probes for
/// missing keys. Immutable once read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub episode_id: i64,
    #[serde(default)]
    pub podcast_id: i64,
    #[serde(default)]
    pub podcast_name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub apple_rating: Option<f64>,
}

/// Denormalized episode metadata carried by every chunk and vector record.
///
/// `episode_title` holds the canonical spelling produced by the title
/// normalizer, not the raw source title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMeta {
    pub episode_id: i64,
    pub podcast_id: i64,
    pub podcast_name: String,
    pub author: String,
    pub category: String,
    pub episode_title: String,
    pub duration: String,
    pub published_date: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub apple_rating: Option<f64>,
}

impl EpisodeMeta {
    /// Copies the document's metadata, swapping in the canonical title.
    pub fn from_document(doc: &SourceDocument, canonical_title: &str) -> Self {
        Self {
            episode_id: doc.episode_id,
            podcast_id: doc.podcast_id,
            podcast_name: doc.podcast_name.clone(),
            author: doc.author.clone(),
            category: doc.category.clone(),
            episode_title: canonical_title.to_string(),
            duration: doc.duration.clone(),
            published_date: doc.published_date.clone(),
            language: doc.language.clone(),
            apple_rating: doc.apple_rating,
        }
    }
}

/// A bounded contiguous slice of one document's transcript.
///
/// - `chunk_id`: globally unique, derived from the document id and ordinal
/// - `chunk_length`: text length in characters, not bytes
/// - `meta`: denormalized copy of the owning episode's metadata
///
/// Chunks are never mutated after creation; the pipeline run that created
/// them owns them exclusively until they reach the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub chunk_index: usize,
    pub chunk_text: String,
    pub chunk_length: usize,
    pub meta: EpisodeMeta,
}

/// Derives the globally unique chunk id from a document id and ordinal index.
pub fn chunk_id_for(document_id: &str, chunk_index: usize) -> ChunkId {
    format!("{}:{}", document_id, chunk_index)
}

/// The durable unit written to the vector store. `chunk_id` is the primary
/// key and must be globally unique — the one hard invariant of the pipeline.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub chunk_id: ChunkId,
    pub chunk_index: usize,
    pub meta: EpisodeMeta,
    pub chunk_text: String,
    pub tags: Vec<String>,
    pub embedding: EmbeddingVector,
    /// Exactly [`TAG_SLOTS`] vectors; slots without a tag repeat `embedding`.
    pub tag_embeddings: Vec<EmbeddingVector>,
    pub language: String,
    pub created_at: String,
    pub source_model: String,
}

impl VectorRecord {
    /// Tags rendered as the serialized JSON array the store schema expects.
    pub fn tags_json(&self) -> String {
        serde_json::to_string(&self.tags).unwrap_or_else(|_| "[]".to_string())
    }

    /// Checks the structural requirements every record must satisfy before
    /// it may be handed to the vector store.
    pub fn validate(&self, dimension: usize) -> Result<(), PipelineError> {
        if self.chunk_id.trim().is_empty() {
            return Err(PipelineError::Validation("empty chunk_id".to_string()));
        }
        if self.chunk_text.is_empty() {
            return Err(PipelineError::Validation(format!(
                "chunk {} has empty text",
                self.chunk_id
            )));
        }
        if self.embedding.len() != dimension {
            return Err(PipelineError::Validation(format!(
                "chunk {}: text embedding has {} dims, expected {}",
                self.chunk_id,
                self.embedding.len(),
                dimension
            )));
        }
        if self.tag_embeddings.len() != TAG_SLOTS {
            return Err(PipelineError::Validation(format!(
                "chunk {}: {} tag vectors, expected {}",
                self.chunk_id,
                self.tag_embeddings.len(),
                TAG_SLOTS
            )));
        }
        for (slot, vector) in self.tag_embeddings.iter().enumerate() {
            if vector.len() != dimension {
                return Err(PipelineError::Validation(format!(
                    "chunk {}: tag vector {} has {} dims, expected {}",
                    self.chunk_id,
                    slot + 1,
                    vector.len(),
                    dimension
                )));
            }
        }
        if self.tags.len() > MAX_TAGS {
            return Err(PipelineError::Validation(format!(
                "chunk {}: {} tags exceed the cap of {}",
                self.chunk_id,
                self.tags.len(),
                MAX_TAGS
            )));
        }
        Ok(())
    }
}

/// One row of the relational episode-title table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeTitleRow {
    pub podcast_id: i64,
    pub episode_id: i64,
    pub episode_title: String,
}
