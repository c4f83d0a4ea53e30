//! Nearest-neighbor lookup over the chunk collection, used by the query
//! tool to spot-check what a run ingested.

use anyhow::{anyhow, Result};
use arrow_array::{Float32Array, RecordBatch, StringArray};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Connection;
use std::path::Path;

use crate::store::open_db;

#[derive(Debug, Clone)]
pub struct ChunkSearchResult {
    pub score: f32,
    pub chunk_id: String,
    pub podcast_name: String,
    pub episode_title: String,
    /// JSON-encoded tag array as stored.
    pub tags: String,
    pub chunk_text: String,
}

pub struct VectorSearch {
    db: Connection,
    collection: String,
}

impl VectorSearch {
    pub async fn new(db_dir: &Path, collection: &str) -> Result<Self> {
        let db = open_db(db_dir.to_string_lossy().as_ref()).await?;
        Ok(Self {
            db,
            collection: collection.to_string(),
        })
    }

    /// Top `limit` chunks nearest to `query_embedding`, best first.
    pub async fn search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>> {
        let table = self.db.open_table(&self.collection).execute().await?;
        let mut stream = table.vector_search(query_embedding)?.limit(limit).execute().await?;

        let mut results = Vec::new();
        while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
            for i in 0..batch.num_rows() {
                results.push(ChunkSearchResult {
                    score: score_at(&batch, i),
                    chunk_id: string_at(&batch, "chunk_id", i)?,
                    podcast_name: string_at(&batch, "podcast_name", i)?,
                    episode_title: string_at(&batch, "episode_title", i)?,
                    tags: string_at(&batch, "tags", i)?,
                    chunk_text: string_at(&batch, "chunk_text", i)?,
                });
            }
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }
}

fn string_at(batch: &RecordBatch, name: &str, row: usize) -> Result<String> {
    let col = batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{} column missing", name))?;
    Ok(col.value(row).to_string())
}

/// Distance column name varies across store versions; fall back to neutral.
fn score_at(batch: &RecordBatch, row: usize) -> f32 {
    for name in ["_distance", "distance"] {
        if let Some(col) = batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        {
            return 1.0 - col.value(row);
        }
    }
    if let Some(col) = batch
        .column_by_name("_score")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
    {
        return col.value(row);
    }
    0.5
}
