//! podbase-embed
//!
//! Fixed-dimension embeddings for chunk texts and tags. The primary path is
//! a local BGE-M3 model via candle; when the model cannot be loaded the
//! generator degrades to a deterministic char-code fallback so the pipeline
//! stays operable end-to-end. Every encode yields an [`EmbedOutcome`] so
//! callers can tell degraded-but-valid output from primary output without
//! parsing error strings.

pub mod device;
pub mod fallback;
pub mod model;
pub mod pool;
pub mod tokenize;

use podbase_core::config::{expand_path, EmbeddingConfig};
use podbase_core::types::TAG_SLOTS;

use crate::fallback::char_code_embedding;
use crate::model::PrimaryModel;

pub const PRIMARY_MODEL: &str = "bge-m3";
pub const FALLBACK_MODEL: &str = "charcode-fallback";

/// Result of one encode call. Both variants carry a vector of the configured
/// dimension; `Fallback` additionally says why the primary path was not used.
#[derive(Debug, Clone)]
pub enum EmbedOutcome {
    Primary(Vec<f32>),
    Fallback { vector: Vec<f32>, reason: String },
}

impl EmbedOutcome {
    pub fn vector(&self) -> &[f32] {
        match self {
            EmbedOutcome::Primary(v) => v,
            EmbedOutcome::Fallback { vector, .. } => vector,
        }
    }

    pub fn into_vector(self) -> Vec<f32> {
        match self {
            EmbedOutcome::Primary(v) => v,
            EmbedOutcome::Fallback { vector, .. } => vector,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, EmbedOutcome::Fallback { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            EmbedOutcome::Primary(_) => None,
            EmbedOutcome::Fallback { reason, .. } => Some(reason),
        }
    }

    /// Provenance string recorded on the vector record.
    pub fn source_model(&self) -> &'static str {
        match self {
            EmbedOutcome::Primary(_) => PRIMARY_MODEL,
            EmbedOutcome::Fallback { .. } => FALLBACK_MODEL,
        }
    }
}

/// Embedding front end. Construction never fails: a missing or broken model
/// leaves the generator in degraded mode rather than stopping the run.
pub struct EmbeddingGenerator {
    primary: Option<PrimaryModel>,
    dimension: usize,
}

impl EmbeddingGenerator {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let primary = if config.force_fallback {
            tracing::info!("embedding model disabled by config, using char-code fallback");
            None
        } else if let Some(dir) = &config.model_dir {
            let path = expand_path(dir);
            match PrimaryModel::load(&path, config.dimension, config.max_len) {
                Ok(model) => Some(model),
                Err(e) => {
                    tracing::warn!(
                        "embedding model unavailable, degrading to char-code fallback: {e:#}"
                    );
                    None
                }
            }
        } else {
            tracing::warn!("no embedding model directory configured, using char-code fallback");
            None
        };
        Self {
            primary,
            dimension: config.dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// True when the whole run operates without the primary model. Callers
    /// log this once instead of once per chunk.
    pub fn is_degraded(&self) -> bool {
        self.primary.is_none()
    }

    /// Encode one text. Never fails: a primary-path error degrades to the
    /// fallback vector with the error chain as reason.
    pub fn encode(&self, text: &str) -> EmbedOutcome {
        match &self.primary {
            Some(model) => match model.embed(text) {
                Ok(vector) => EmbedOutcome::Primary(vector),
                Err(e) => EmbedOutcome::Fallback {
                    vector: char_code_embedding(text, self.dimension),
                    reason: format!("{e:#}"),
                },
            },
            None => EmbedOutcome::Fallback {
                vector: char_code_embedding(text, self.dimension),
                reason: "primary model unavailable".to_string(),
            },
        }
    }

    /// Encode several texts, order preserved, one outcome per input.
    pub fn encode_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<EmbedOutcome> {
        texts.iter().map(|t| self.encode(t.as_ref())).collect()
    }

    /// Exactly [`TAG_SLOTS`] tag vectors for a chunk: one per tag, the rest
    /// filled by repeating the chunk's text embedding.
    pub fn encode_tag_slots(&self, tags: &[String], text_embedding: &[f32]) -> Vec<Vec<f32>> {
        let mut slots: Vec<Vec<f32>> = tags
            .iter()
            .take(TAG_SLOTS)
            .map(|tag| self.encode(tag).into_vector())
            .collect();
        while slots.len() < TAG_SLOTS {
            slots.push(text_embedding.to_vec());
        }
        slots
    }
}
