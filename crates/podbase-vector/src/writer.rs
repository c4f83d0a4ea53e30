//! Deduplicating batch writer.
//!
//! Before writing, the full set of chunk_ids already in the collection is
//! loaded; candidates whose id is present (or repeats inside the same call)
//! are counted as duplicates and skipped, which makes re-running a
//! collection a no-op for already-inserted chunks. Survivors go in in
//! fixed-size batches; a failed batch is logged and does not stop the
//! remaining batches.

use anyhow::Result;
use arrow_array::{
    Float64Array, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray,
};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::{Connection, Table};
use serde::Serialize;
use std::sync::Arc;

use podbase_core::config::{expand_path, VectorStoreConfig};
use podbase_core::error::PipelineError;
use podbase_core::error_log::{ErrorLog, Severity};
use podbase_core::types::VectorRecord;

use crate::schema::build_chunk_schema;
use crate::store::{ensure_collection, existing_chunk_ids, open_db};

/// Counts from one `write` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped_invalid: usize,
    pub failed_batches: usize,
}

impl WriteReport {
    pub fn merge(&mut self, other: &WriteReport) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.skipped_invalid += other.skipped_invalid;
        self.failed_batches += other.failed_batches;
    }
}

pub struct VectorStoreWriter {
    db: Connection,
    collection: String,
    dimension: usize,
    batch_size: usize,
    max_chunk_text_len: usize,
}

impl VectorStoreWriter {
    /// Open the store. Failure here is fatal for the run; everything past
    /// this point degrades per item instead of aborting.
    pub async fn new(config: &VectorStoreConfig, dimension: usize) -> Result<Self> {
        let db_dir = expand_path(&config.db_dir);
        let db = open_db(db_dir.to_string_lossy().as_ref()).await?;
        Ok(Self {
            db,
            collection: config.collection.clone(),
            dimension,
            batch_size: config.insert_batch_size.max(1),
            max_chunk_text_len: config.max_chunk_text_len,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn ensure_collection(&self) -> Result<()> {
        ensure_collection(
            &self.db,
            &self.collection,
            build_chunk_schema(self.dimension as i32),
        )
        .await
    }

    /// Write records with dedup on `chunk_id`. Invalid records and failing
    /// batches are recorded in `errors` and skipped.
    pub async fn write(
        &self,
        records: &[VectorRecord],
        errors: &mut ErrorLog,
    ) -> Result<WriteReport> {
        let mut report = WriteReport::default();
        if records.is_empty() {
            return Ok(report);
        }

        self.ensure_collection().await?;
        let table = self.db.open_table(&self.collection).execute().await?;
        let mut existing = existing_chunk_ids(&table).await?;
        tracing::debug!(existing = existing.len(), "loaded existing chunk ids");

        let mut pending: Vec<&VectorRecord> = Vec::new();
        for record in records {
            if let Err(e) = record.validate(self.dimension) {
                report.skipped_invalid += 1;
                errors.log(
                    &e,
                    Severity::Error,
                    "vector_store_write",
                    Some(&record.chunk_id),
                );
                continue;
            }
            // insert() returning false covers both store duplicates and
            // repeats inside this call
            if !existing.insert(record.chunk_id.clone()) {
                report.duplicates += 1;
                continue;
            }
            pending.push(record);
        }

        let pb = ProgressBar::new(pending.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} records {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        for batch in pending.chunks(self.batch_size) {
            match self.insert_batch(&table, batch).await {
                Ok(()) => report.inserted += batch.len(),
                Err(e) => {
                    report.failed_batches += 1;
                    errors.log_detailed(
                        &PipelineError::VectorStoreWrite(format!(
                            "batch of {} records rejected",
                            batch.len()
                        )),
                        Severity::Error,
                        "vector_store_write",
                        batch.first().map(|r| r.chunk_id.as_str()),
                        format!("{e:#}"),
                    );
                }
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
        Ok(report)
    }

    async fn insert_batch(&self, table: &Table, records: &[&VectorRecord]) -> Result<()> {
        let batch = self.records_to_batch(records)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        table.add(reader).execute().await?;
        Ok(())
    }

    fn records_to_batch(&self, records: &[&VectorRecord]) -> Result<RecordBatch> {
        let schema = build_chunk_schema(self.dimension as i32);

        let mut chunk_ids = Vec::new();
        let mut chunk_indices = Vec::new();
        let mut episode_ids = Vec::new();
        let mut podcast_ids = Vec::new();
        let mut podcast_names = Vec::new();
        let mut authors = Vec::new();
        let mut categories = Vec::new();
        let mut episode_titles = Vec::new();
        let mut durations = Vec::new();
        let mut published_dates = Vec::new();
        let mut ratings: Vec<Option<f64>> = Vec::new();
        let mut chunk_texts = Vec::new();
        let mut embeddings: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        let mut tag_vectors: Vec<Vec<Option<Vec<Option<f32>>>>> =
            vec![Vec::new(); podbase_core::types::TAG_SLOTS];
        let mut languages = Vec::new();
        let mut created_ats = Vec::new();
        let mut source_models = Vec::new();
        let mut tags_json = Vec::new();

        for record in records {
            chunk_ids.push(record.chunk_id.clone());
            chunk_indices.push(record.chunk_index as i32);
            episode_ids.push(record.meta.episode_id);
            podcast_ids.push(record.meta.podcast_id);
            podcast_names.push(record.meta.podcast_name.clone());
            authors.push(record.meta.author.clone());
            categories.push(record.meta.category.clone());
            episode_titles.push(record.meta.episode_title.clone());
            durations.push(record.meta.duration.clone());
            published_dates.push(record.meta.published_date.clone());
            ratings.push(record.meta.apple_rating);
            chunk_texts.push(truncate_chars(&record.chunk_text, self.max_chunk_text_len));
            embeddings.push(Some(record.embedding.iter().map(|&x| Some(x)).collect()));
            for (slot, column) in record.tag_embeddings.iter().zip(tag_vectors.iter_mut()) {
                column.push(Some(slot.iter().map(|&x| Some(x)).collect()));
            }
            languages.push(record.language.clone());
            created_ats.push(record.created_at.clone());
            source_models.push(record.source_model.clone());
            tags_json.push(record.tags_json());
        }

        let dim = self.dimension as i32;
        let mut columns: Vec<Arc<dyn arrow_array::Array>> = vec![
            Arc::new(StringArray::from(chunk_ids)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(Int64Array::from(episode_ids)),
            Arc::new(Int64Array::from(podcast_ids)),
            Arc::new(StringArray::from(podcast_names)),
            Arc::new(StringArray::from(authors)),
            Arc::new(StringArray::from(categories)),
            Arc::new(StringArray::from(episode_titles)),
            Arc::new(StringArray::from(durations)),
            Arc::new(StringArray::from(published_dates)),
            Arc::new(Float64Array::from(ratings)),
            Arc::new(StringArray::from(chunk_texts)),
            Arc::new(fixed_size_vectors(embeddings, dim)),
        ];
        for column in tag_vectors {
            columns.push(Arc::new(fixed_size_vectors(column, dim)));
        }
        columns.extend([
            Arc::new(StringArray::from(languages)) as Arc<dyn arrow_array::Array>,
            Arc::new(StringArray::from(created_ats)),
            Arc::new(StringArray::from(source_models)),
            Arc::new(StringArray::from(tags_json)),
        ]);

        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

fn fixed_size_vectors(
    values: Vec<Option<Vec<Option<f32>>>>,
    dim: i32,
) -> arrow_array::FixedSizeListArray {
    arrow_array::FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
        values.into_iter(),
        dim,
    )
}

/// Bound a text to `max` characters without splitting a code point.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
