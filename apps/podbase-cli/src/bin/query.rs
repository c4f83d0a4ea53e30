use std::env;

use podbase_core::config::{expand_path, PipelineConfig};
use podbase_embed::EmbeddingGenerator;
use podbase_vector::VectorSearch;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [--limit N]", args[0]);
        eprintln!("Example: {} '資產配置' --limit 5", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];
    let mut limit = 5usize;
    let mut i = 2; while i < args.len() { match args[i].as_str() {
        "--limit" => { if i + 1 < args.len() { if let Ok(n) = args[i + 1].parse::<usize>() { limit = n; i += 1; } else { eprintln!("Error: --limit requires a number"); std::process::exit(1); } } else { eprintln!("Error: --limit requires a number"); std::process::exit(1); } }
        _ => {} } i += 1; }

    let config = PipelineConfig::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    println!("🔍 podbase query\n================");
    println!("Query: {}", query_text);
    println!("Collection: {}", config.vector_store.collection);

    let embedder = EmbeddingGenerator::new(&config.embedding);
    if embedder.is_degraded() {
        println!("⚠️  Embedding model unavailable, scoring with fallback vectors");
    }
    let query_vector = embedder.encode(query_text).into_vector();

    let search = VectorSearch::new(
        &expand_path(&config.vector_store.db_dir),
        &config.vector_store.collection,
    )
    .await?;
    let results = search.search(query_vector, limit).await?;

    println!("\n🔍 Found {} results for \"{}\"", results.len(), query_text);
    for (i, result) in results.iter().enumerate() {
        println!(
            "\n  {}. score={:.4}  chunk={}  podcast={}  episode={}",
            i + 1, result.score, result.chunk_id, result.podcast_name, result.episode_title
        );
        println!("     🏷  Tags: {}", result.tags);
        println!("     📝 {}", preview(&result.chunk_text, 160));
    }
    Ok(())
}
