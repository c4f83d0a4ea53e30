use std::env;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use podbase_core::config::{expand_path, PipelineConfig};
use podbase_core::doc_store::JsonDocumentStore;
use podbase_ingest::IngestionRunner;
use podbase_stage::SqliteTitleStore;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut config = PipelineConfig::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--limit" => { if i + 1 < args.len() { if let Ok(n) = args[i + 1].parse::<usize>() { config.pipeline.document_limit = Some(n); i += 1; } else { eprintln!("Error: --limit requires a number"); std::process::exit(1); } } else { eprintln!("Error: --limit requires a number"); std::process::exit(1); } }
        "--force-fallback" => config.embedding.force_fallback = true,
        _ if !args[i].starts_with('-') => config.data.documents_dir = args[i].clone(),
        _ => { eprintln!("Usage: podbase-ingest [--limit N] [--force-fallback] [documents_dir]"); std::process::exit(1); } } i += 1; }

    println!("podbase ingest\n==============");
    println!("Documents: {}", config.data.documents_dir);
    println!("Vector store: {} (collection {})", config.vector_store.db_dir, config.vector_store.collection);
    if let Some(limit) = config.pipeline.document_limit { println!("🔢 Limiting to {} documents per collection", limit); }

    let documents = JsonDocumentStore::new(expand_path(&config.data.documents_dir));
    let titles = Arc::new(SqliteTitleStore::open(&expand_path(&config.relational.db_file))?);
    let runner = IngestionRunner::new(config, Box::new(documents), titles).await?;

    let stop = runner.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Stop requested, finishing the current document first");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let summary = runner.run().await?;

    println!("\n✅ Ingestion finished in {:.1}s", summary.elapsed_secs);
    println!("📊 Collections: {} processed, {} skipped", summary.collections_processed, summary.collections_skipped);
    println!("📊 Documents: {}   Chunks: {} ({} via fallback embeddings)", summary.documents, summary.chunks, summary.fallback_chunks);
    println!("📊 Records: {} inserted, {} duplicates, {} invalid, {} failed batches", summary.write.inserted, summary.write.duplicates, summary.write.skipped_invalid, summary.write.failed_batches);
    if summary.errors_logged > 0 { println!("⚠️  {} errors logged, reports are in the reports directory", summary.errors_logged); }
    if summary.stopped_early { println!("🛑 Run stopped early; rerun to continue from the checkpoint"); }
    Ok(())
}
