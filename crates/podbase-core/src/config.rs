//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars (nested keys separated by `__`, e.g. `APP_DATA__STAGE3_DIR`).
//! Provides a helper to expand `~` and `${VAR}` in user-supplied paths.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Top-level pipeline configuration with defaults for every key, so a bare
/// checkout runs against `./data` without any config file present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub chunking: ChunkingConfig,
    pub tagging: TaggingConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub relational: RelationalConfig,
    pub pipeline: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of the source document store: one subdirectory per collection.
    pub documents_dir: String,
    /// Stage3 artifacts: tagged chunks, one JSON file per document.
    pub stage3_dir: String,
    /// Stage4 artifacts: tagged + embedded chunks.
    pub stage4_dir: String,
    /// Operator reports (sync report, error summary, run summary).
    pub reports_dir: String,
    /// Persisted set of fully-processed collection ids.
    pub checkpoint_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            documents_dir: "./data/documents".to_string(),
            stage3_dir: "./data/stage3_tagged".to_string(),
            stage4_dir: "./data/stage4_embedded".to_string(),
            reports_dir: "./data/reports".to_string(),
            checkpoint_file: "./data/processed_collections.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound on chunk length in characters.
    pub max_chunk_size: usize,
    /// Trailing characters of one chunk repeated at the head of the next.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1024,
            overlap: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// TSV taxonomy file (keyword, main category, sub category, tags, weight).
    /// When unset, extraction starts at the built-in keyword tier.
    pub taxonomy_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Local BGE-M3 model directory (tokenizer.json, config.json,
    /// pytorch_model.bin). When unset or missing the generator degrades to
    /// the deterministic char-code fallback.
    pub model_dir: Option<String>,
    pub dimension: usize,
    /// Token budget per encoded text.
    pub max_len: usize,
    /// Skip model loading entirely; used by tests and model-free hosts.
    pub force_fallback: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            dimension: 1024,
            max_len: 256,
            force_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub db_dir: String,
    pub collection: String,
    /// Records per insert call; bounds request size and memory.
    pub insert_batch_size: usize,
    /// Longest chunk text the store accepts; longer texts are truncated at
    /// record-build time.
    pub max_chunk_text_len: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            db_dir: "./data/lancedb".to_string(),
            collection: "podcast_chunks".to_string(),
            insert_batch_size: 100,
            max_chunk_text_len: 8192,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelationalConfig {
    /// SQLite file holding the episode-title table.
    pub db_file: String,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            db_file: "./data/podbase.sqlite3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Per-collection document pull limit; unset processes everything.
    pub document_limit: Option<usize>,
    /// Language recorded on documents that do not declare one.
    pub default_language: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            document_limit: None,
            default_language: "zh-TW".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration for the current `RUST_ENV` (dev/prod/test).
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(&Self::figment())
    }

    /// The merge stack: base toml, env-specific toml, then `APP_*` overrides.
    pub fn figment() -> Figment {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn from_figment(figment: &Figment) -> anyhow::Result<Self> {
        figment
            .extract()
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
