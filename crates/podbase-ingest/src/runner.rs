//! Per-collection ingestion orchestration.
//!
//! The runner owns every pipeline stage as an explicitly-constructed field
//! and threads them through one document at a time: normalize title, clean,
//! chunk, tag, write stage3, embed, write stage4, vector write, title
//! upsert. Per-item failures go through the error log and processing
//! continues; only store-level failures (vector store connection, document
//! listing, checkpoint load) abort the run. The stop flag is consulted at
//! document and collection boundaries only, never mid-document.

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use podbase_core::checkpoint::ProgressCheckpoint;
use podbase_core::config::{expand_path, PipelineConfig};
use podbase_core::error::PipelineError;
use podbase_core::error_log::{ErrorLog, Severity};
use podbase_core::traits::{DocumentStore, TitleStore};
use podbase_core::types::{EpisodeMeta, SourceDocument, VectorRecord};
use podbase_embed::EmbeddingGenerator;
use podbase_stage::{artifact_stem, write_stage3, write_stage4, EmbeddedChunk, TaggedChunk};
use podbase_text::chunker::clean_text;
use podbase_text::{normalize_title, TagExtractor, TextChunker};
use podbase_vector::{VectorStoreWriter, WriteReport};

/// Counters for one ingestion run, written to `run_summary.json` and handed
/// back to the caller for display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub collections_processed: usize,
    pub collections_skipped: usize,
    pub documents: usize,
    pub chunks: usize,
    /// Chunks embedded through the char-code fallback instead of the model.
    pub fallback_chunks: usize,
    pub write: WriteReport,
    pub errors_logged: usize,
    pub errors_by_stage: BTreeMap<String, usize>,
    pub stopped_early: bool,
    pub elapsed_secs: f64,
}

#[derive(Default)]
struct CollectionOutcome {
    documents: usize,
    chunks: usize,
    fallback_chunks: usize,
    write: WriteReport,
    completed: bool,
}

#[derive(Default)]
struct DocReport {
    chunks: usize,
    fallback_chunks: usize,
    write: WriteReport,
}

pub struct IngestionRunner {
    config: PipelineConfig,
    documents: Box<dyn DocumentStore>,
    titles: Arc<dyn TitleStore>,
    chunker: TextChunker,
    tagger: TagExtractor,
    embedder: EmbeddingGenerator,
    writer: VectorStoreWriter,
    stop: Arc<AtomicBool>,
}

impl IngestionRunner {
    /// Build the pipeline context. Fails only on resource acquisition: a
    /// configured-but-unloadable taxonomy file or an unreachable vector
    /// store. A missing embedding model degrades instead of failing.
    pub async fn new(
        config: PipelineConfig,
        documents: Box<dyn DocumentStore>,
        titles: Arc<dyn TitleStore>,
    ) -> Result<Self> {
        let chunker = TextChunker::new(config.chunking.max_chunk_size, config.chunking.overlap);
        let tagger = match &config.tagging.taxonomy_file {
            Some(path) => TagExtractor::from_taxonomy_file(&expand_path(path))
                .with_context(|| format!("failed to load taxonomy {path}"))?,
            None => TagExtractor::new(),
        };
        let embedder = EmbeddingGenerator::new(&config.embedding);
        let writer = VectorStoreWriter::new(&config.vector_store, config.embedding.dimension)
            .await
            .context("failed to open vector store")?;
        Ok(Self {
            config,
            documents,
            titles,
            chunker,
            tagger,
            embedder,
            writer,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shared flag for signal handlers. Setting it stops the run at the next
    /// document boundary.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Ingest every collection the document store knows about, skipping the
    /// ones already checkpointed. Reports land in the configured reports dir.
    ///
    /// A vector store write failure is the one mid-run error that aborts the
    /// whole run; it is logged as critical and the reports are still written
    /// before the error propagates.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = std::time::Instant::now();
        let checkpoint_path = expand_path(&self.config.data.checkpoint_file);
        let mut checkpoint = ProgressCheckpoint::load(&checkpoint_path)?;
        let mut errors = ErrorLog::new();
        let mut summary = RunSummary::default();
        let mut fatal: Option<anyhow::Error> = None;

        let collections = self
            .documents
            .list_collections()
            .context("failed to list collections")?;
        tracing::info!(
            total = collections.len(),
            already_done = checkpoint.len(),
            degraded = self.embedder.is_degraded(),
            "starting ingestion run"
        );

        for collection in &collections {
            if self.stop.load(Ordering::SeqCst) {
                summary.stopped_early = true;
                break;
            }
            if checkpoint.is_done(collection) {
                tracing::info!(collection, "already ingested, skipping");
                summary.collections_skipped += 1;
                continue;
            }

            let outcome = match self.process_collection(collection, &mut errors).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    errors.log_detailed(
                        &PipelineError::VectorStoreWrite(
                            "aborting run: store write failed".to_string(),
                        ),
                        Severity::Critical,
                        "vector_store_write",
                        Some(collection),
                        format!("{e:#}"),
                    );
                    fatal = Some(e);
                    break;
                }
            };
            summary.documents += outcome.documents;
            summary.chunks += outcome.chunks;
            summary.fallback_chunks += outcome.fallback_chunks;
            summary.write.merge(&outcome.write);

            if outcome.completed {
                summary.collections_processed += 1;
                if let Err(e) = checkpoint.mark_done(collection) {
                    errors.log(
                        &PipelineError::General(format!("checkpoint save failed: {e:#}")),
                        Severity::Error,
                        "checkpoint",
                        Some(collection),
                    );
                }
            } else if self.stop.load(Ordering::SeqCst) {
                summary.stopped_early = true;
                break;
            }
        }

        summary.errors_logged = errors.len();
        for record in errors.records() {
            *summary.errors_by_stage.entry(record.stage.clone()).or_default() += 1;
        }
        summary.elapsed_secs = started.elapsed().as_secs_f64();
        self.write_run_reports(&summary, &errors);
        if let Some(e) = fatal {
            return Err(e);
        }
        Ok(summary)
    }

    async fn process_collection(
        &self,
        collection: &str,
        errors: &mut ErrorLog,
    ) -> Result<CollectionOutcome> {
        let docs = match self
            .documents
            .get_documents(collection, self.config.pipeline.document_limit)
        {
            Ok(docs) => docs,
            Err(e) => {
                errors.log(
                    &PipelineError::General(format!("failed to load documents: {e:#}")),
                    Severity::Error,
                    "document_load",
                    Some(collection),
                );
                return Ok(CollectionOutcome::default());
            }
        };

        println!("📁 {}: {} documents", collection, docs.len());
        let pb = ProgressBar::new(docs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut outcome = CollectionOutcome {
            completed: true,
            ..CollectionOutcome::default()
        };
        for doc in &docs {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!(collection, "stop requested, leaving collection incomplete");
                outcome.completed = false;
                break;
            }
            pb.set_message(doc.id.clone());
            let report = self.process_document(doc, errors).await?;
            outcome.documents += 1;
            outcome.chunks += report.chunks;
            outcome.fallback_chunks += report.fallback_chunks;
            outcome.write.merge(&report.write);
            pb.inc(1);
        }
        pb.finish_and_clear();

        tracing::info!(
            collection,
            documents = outcome.documents,
            chunks = outcome.chunks,
            inserted = outcome.write.inserted,
            duplicates = outcome.write.duplicates,
            completed = outcome.completed,
            "collection processed"
        );
        Ok(outcome)
    }

    /// One document through the whole pipeline. Every step short of the
    /// vector store keeps going on failure; the store write's own error
    /// handling is batch-scoped inside the writer.
    async fn process_document(
        &self,
        doc: &SourceDocument,
        errors: &mut ErrorLog,
    ) -> Result<DocReport> {
        let canonical_title = normalize_title(&doc.title);
        let stem = artifact_stem(&doc.id, &doc.title);
        let meta = EpisodeMeta::from_document(doc, &canonical_title);

        let cleaned = clean_text(&doc.content);
        let chunks = self.chunker.chunk(&doc.id, &cleaned, &meta);
        if chunks.is_empty() {
            tracing::debug!(document = %doc.id, "no chunks produced");
            return Ok(DocReport::default());
        }

        let tag_sets: Vec<Vec<String>> = chunks
            .iter()
            .map(|c| self.tagger.extract_tags(&c.chunk_text))
            .collect();

        let tagged: Vec<TaggedChunk> = chunks
            .iter()
            .zip(&tag_sets)
            .map(|(chunk, tags)| TaggedChunk::from_chunk(chunk, tags.clone()))
            .collect();
        let stage3_dir = expand_path(&self.config.data.stage3_dir);
        if let Err(e) = write_stage3(&stage3_dir, &stem, &tagged) {
            errors.log(
                &PipelineError::General(format!("stage3 write failed: {e:#}")),
                Severity::Error,
                "stage3_write",
                Some(&doc.id),
            );
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.chunk_text.as_str()).collect();
        let outcomes = self.embedder.encode_batch(&texts);

        // In degraded mode every outcome is a fallback and the generator
        // already said so once; per-chunk records would only drown the log.
        if !self.embedder.is_degraded() {
            for (chunk, outcome) in chunks.iter().zip(&outcomes) {
                if let Some(reason) = outcome.reason() {
                    errors.log(
                        &PipelineError::Vectorization(reason.to_string()),
                        Severity::Warning,
                        "vectorization",
                        Some(&chunk.chunk_id),
                    );
                }
            }
        }
        let fallback_chunks = outcomes.iter().filter(|o| o.is_fallback()).count();

        let created_at = Utc::now().to_rfc3339();
        let language = doc
            .language
            .clone()
            .unwrap_or_else(|| self.config.pipeline.default_language.clone());

        let embedded: Vec<EmbeddedChunk> = tagged
            .iter()
            .zip(&outcomes)
            .map(|(chunk, outcome)| {
                EmbeddedChunk::from_tagged(
                    chunk,
                    outcome.vector().to_vec(),
                    language.clone(),
                    created_at.clone(),
                    outcome.source_model().to_string(),
                )
            })
            .collect();
        let stage4_dir = expand_path(&self.config.data.stage4_dir);
        if let Err(e) = write_stage4(&stage4_dir, &stem, &embedded) {
            errors.log(
                &PipelineError::General(format!("stage4 write failed: {e:#}")),
                Severity::Error,
                "stage4_write",
                Some(&doc.id),
            );
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(tag_sets)
            .zip(outcomes)
            .map(|((chunk, tags), outcome)| {
                let tag_embeddings = self.embedder.encode_tag_slots(&tags, outcome.vector());
                let source_model = outcome.source_model().to_string();
                VectorRecord {
                    chunk_id: chunk.chunk_id.clone(),
                    chunk_index: chunk.chunk_index,
                    meta: chunk.meta.clone(),
                    chunk_text: chunk.chunk_text.clone(),
                    tags,
                    embedding: outcome.into_vector(),
                    tag_embeddings,
                    language: language.clone(),
                    created_at: created_at.clone(),
                    source_model,
                }
            })
            .collect();

        let write = self.writer.write(&records, errors).await?;

        if !canonical_title.is_empty() {
            if let Err(e) =
                self.titles
                    .upsert_episode(doc.podcast_id, doc.episode_id, &canonical_title)
            {
                errors.log(
                    &PipelineError::General(format!("title upsert failed: {e:#}")),
                    Severity::Error,
                    "relational_write",
                    Some(&doc.id),
                );
            }
        }

        Ok(DocReport {
            chunks: chunks.len(),
            fallback_chunks,
            write,
        })
    }

    /// Best effort; a run that processed data is not failed over a report.
    fn write_run_reports(&self, summary: &RunSummary, errors: &ErrorLog) {
        let reports_dir = expand_path(&self.config.data.reports_dir);
        if let Err(e) = std::fs::create_dir_all(&reports_dir) {
            tracing::warn!("failed to create reports dir: {e}");
            return;
        }
        if let Err(e) = errors.write_reports(&reports_dir) {
            tracing::warn!("failed to write error reports: {e}");
        }
        match serde_json::to_string_pretty(summary) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(reports_dir.join("run_summary.json"), raw) {
                    tracing::warn!("failed to write run summary: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize run summary: {e}"),
        }
    }
}
