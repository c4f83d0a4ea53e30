use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::fs;
use tempfile::TempDir;

use podbase_core::checkpoint::ProgressCheckpoint;
use podbase_core::config::PipelineConfig;
use podbase_core::doc_store::JsonDocumentStore;
use podbase_core::error::PipelineError;
use podbase_core::error_log::{ErrorLog, ReportFormat, Severity};
use podbase_core::traits::DocumentStore;
use podbase_core::types::{chunk_id_for, Chunk, EpisodeMeta, SourceDocument, VectorRecord, TAG_SLOTS};

fn sample_meta() -> EpisodeMeta {
    EpisodeMeta {
        episode_id: 42,
        podcast_id: 7,
        podcast_name: "股癌".to_string(),
        author: "謝孟恭".to_string(),
        category: "投資".to_string(),
        episode_title: "EP42_台積電法說會".to_string(),
        duration: "45:00".to_string(),
        published_date: "2024-03-01".to_string(),
        language: None,
        apple_rating: Some(4.9),
    }
}

fn sample_record(dimension: usize) -> VectorRecord {
    VectorRecord {
        chunk_id: chunk_id_for("doc-1", 0),
        chunk_index: 0,
        meta: sample_meta(),
        chunk_text: "台積電今天的法說會提到先進製程。".to_string(),
        tags: vec!["半導體".to_string()],
        embedding: vec![0.1; dimension],
        tag_embeddings: vec![vec![0.1; dimension]; TAG_SLOTS],
        language: "zh-TW".to_string(),
        created_at: "2024-03-01T00:00:00Z".to_string(),
        source_model: "fallback".to_string(),
    }
}

#[test]
fn chunk_id_is_document_and_index() {
    assert_eq!(chunk_id_for("ep-99", 3), "ep-99:3");
    assert_eq!(chunk_id_for("ep-99", 0), "ep-99:0");
}

#[test]
fn vector_record_validates_dimensions() {
    let record = sample_record(8);
    assert!(record.validate(8).is_ok());
    assert!(record.validate(16).is_err(), "wrong dimension must fail");

    let mut short_slots = sample_record(8);
    short_slots.tag_embeddings.pop();
    assert!(short_slots.validate(8).is_err(), "must carry all tag slots");

    let mut empty_text = sample_record(8);
    empty_text.chunk_text.clear();
    assert!(empty_text.validate(8).is_err(), "empty text is invalid");
}

#[test]
fn vector_record_tags_serialize_as_json_array() {
    let record = sample_record(4);
    let parsed: Vec<String> = serde_json::from_str(&record.tags_json()).expect("tags json");
    assert_eq!(parsed, vec!["半導體".to_string()]);
}

#[test]
fn chunk_carries_char_based_length() {
    let chunk = Chunk {
        chunk_id: chunk_id_for("doc", 0),
        chunk_index: 0,
        chunk_text: "你好".to_string(),
        chunk_length: "你好".chars().count(),
        meta: sample_meta(),
    };
    assert_eq!(chunk.chunk_length, 2, "lengths count characters, not bytes");
}

#[test]
fn checkpoint_missing_file_starts_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("done.json");
    let checkpoint = ProgressCheckpoint::load(&path).expect("load");
    assert!(checkpoint.is_empty());
    assert!(!checkpoint.is_done("podcast_a"));
}

#[test]
fn checkpoint_round_trips_completed_collections() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested/done.json");

    let mut checkpoint = ProgressCheckpoint::load(&path).expect("load");
    checkpoint.mark_done("podcast_b").expect("mark b");
    checkpoint.mark_done("podcast_a").expect("mark a");

    let reloaded = ProgressCheckpoint::load(&path).expect("reload");
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.is_done("podcast_a"));
    assert!(reloaded.is_done("podcast_b"));
    assert!(!reloaded.is_done("podcast_c"));

    let names: Vec<&str> = reloaded.completed().collect();
    assert_eq!(names, vec!["podcast_a", "podcast_b"], "sorted and stable");
}

#[test]
fn checkpoint_rejects_corrupt_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("done.json");
    fs::write(&path, "{not json").unwrap();
    assert!(ProgressCheckpoint::load(&path).is_err());
}

#[test]
fn error_log_summarizes_by_type_and_severity() {
    let mut log = ErrorLog::new();
    log.log(
        &PipelineError::Vectorization("model unavailable".to_string()),
        Severity::Warning,
        "embedding",
        Some("doc-1:0"),
    );
    log.log(
        &PipelineError::Vectorization("model unavailable".to_string()),
        Severity::Warning,
        "embedding",
        Some("doc-1:1"),
    );
    log.log(
        &PipelineError::VectorStoreWrite("batch rejected".to_string()),
        Severity::Error,
        "vector_store_write",
        None,
    );

    let summary = log.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.by_type.get("VectorizationError"), Some(&2));
    assert_eq!(summary.by_type.get("VectorStoreWriteError"), Some(&1));
    assert_eq!(summary.by_severity.get("warning"), Some(&2));
    assert_eq!(summary.by_severity.get("error"), Some(&1));
    assert_eq!(log.count_by_severity(Severity::Warning), 2);
}

#[test]
fn error_log_exports_all_formats() {
    let mut log = ErrorLog::new();
    log.log(
        &PipelineError::TagExtraction("taxonomy row, with comma".to_string()),
        Severity::Error,
        "tagging",
        Some("doc-2"),
    );

    let json = log.export(ReportFormat::Json);
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json report");
    assert_eq!(value["summary"]["total"], 1);
    assert_eq!(value["records"][0]["error_type"], "TagExtractionError");

    let csv = log.export(ReportFormat::Csv);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("timestamp,error_type,severity,stage,context,message")
    );
    let row = lines.next().expect("one data row");
    assert!(row.contains("TagExtractionError"));
    assert!(row.contains("\"tag extraction failed: taxonomy row, with comma\""));

    let text = log.export(ReportFormat::Text);
    assert!(text.contains("Total errors: 1"));
    assert!(text.contains("TagExtractionError"));
}

#[test]
fn error_log_writes_report_files() {
    let tmp = TempDir::new().unwrap();
    let mut log = ErrorLog::new();
    log.log(
        &PipelineError::Sync("missing artifact".to_string()),
        Severity::Warning,
        "stage_sync",
        None,
    );
    let written = log.write_reports(tmp.path()).expect("write reports");
    assert_eq!(written.len(), 3);
    for path in written {
        assert!(path.exists());
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }
}

#[test]
fn json_store_lists_collections_sorted() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("zeta")).unwrap();
    fs::create_dir(tmp.path().join("alpha")).unwrap();
    fs::write(tmp.path().join("stray.txt"), "ignored").unwrap();

    let store = JsonDocumentStore::new(tmp.path());
    let collections = store.list_collections().expect("list");
    assert_eq!(collections, vec!["alpha", "zeta"]);
}

#[test]
fn json_store_reads_single_and_array_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("show");
    fs::create_dir(&dir).unwrap();
    fs::write(
        dir.join("ep1.json"),
        r#"{"id":"ep1","title":"EP1","content":"第一集內容。","episode_id":1,"podcast_id":9}"#,
    )
    .unwrap();
    fs::write(
        dir.join("more.json"),
        r#"[{"title":"EP2","content":"第二集內容。"},{"title":"EP3","content":"第三集內容。"}]"#,
    )
    .unwrap();

    let store = JsonDocumentStore::new(tmp.path());
    let docs = store.get_documents("show", None).expect("documents");
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].id, "ep1");
    // array entries without ids get file-stem-derived ones
    assert_eq!(docs[1].id, "more-0");
    assert_eq!(docs[2].id, "more-1");
}

#[test]
fn json_store_skips_bad_files_and_honors_limit() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("show");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("bad.json"), "{broken").unwrap();
    fs::write(
        dir.join("good.json"),
        r#"[{"content":"甲"},{"content":"乙"},{"content":"丙"}]"#,
    )
    .unwrap();

    let store = JsonDocumentStore::new(tmp.path());
    let docs = store.get_documents("show", Some(2)).expect("documents");
    assert_eq!(docs.len(), 2, "bad file skipped, limit applied");
}

#[test]
fn source_document_defaults_missing_fields() {
    let doc: SourceDocument =
        serde_json::from_str(r#"{"content":"只有內容"}"#).expect("lenient parse");
    assert!(doc.id.is_empty());
    assert!(doc.title.is_empty());
    assert_eq!(doc.episode_id, 0);
    assert_eq!(doc.apple_rating, None);
    assert_eq!(doc.language, None);
}

#[test]
fn config_defaults_need_no_file() {
    let config = PipelineConfig::default();
    assert_eq!(config.chunking.max_chunk_size, 1024);
    assert_eq!(config.chunking.overlap, 100);
    assert_eq!(config.embedding.dimension, 1024);
    assert_eq!(config.embedding.max_len, 256);
    assert!(!config.embedding.force_fallback);
    assert_eq!(config.embedding.model_dir, None);
    assert_eq!(config.tagging.taxonomy_file, None);
    assert_eq!(config.vector_store.collection, "podcast_chunks");
    assert_eq!(config.vector_store.insert_batch_size, 100);
    assert_eq!(config.vector_store.max_chunk_text_len, 8192);
    assert_eq!(config.pipeline.document_limit, None);
    assert_eq!(config.pipeline.default_language, "zh-TW");
    assert_eq!(config.data.documents_dir, "./data/documents");
    assert_eq!(config.data.checkpoint_file, "./data/processed_collections.json");
}

#[test]
fn config_file_overrides_only_named_keys() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    fs::write(
        &path,
        "[chunking]\nmax_chunk_size = 512\n\n[vector_store]\ncollection = \"test_chunks\"\n",
    )
    .unwrap();

    let figment = Figment::new().merge(Toml::file(&path));
    let config = PipelineConfig::from_figment(&figment).expect("load from file");
    assert_eq!(config.chunking.max_chunk_size, 512);
    assert_eq!(config.chunking.overlap, 100, "unnamed keys keep their defaults");
    assert_eq!(config.vector_store.collection, "test_chunks");
    assert_eq!(config.vector_store.insert_batch_size, 100);
    assert_eq!(config.embedding.dimension, 1024, "untouched sections keep defaults");
}

#[test]
fn env_vars_override_config_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    fs::write(&path, "[chunking]\nmax_chunk_size = 512\n").unwrap();

    std::env::set_var("APP_CHUNKING__MAX_CHUNK_SIZE", "2048");
    std::env::set_var("APP_EMBEDDING__FORCE_FALLBACK", "true");
    let figment = Figment::new()
        .merge(Toml::file(&path))
        .merge(Env::prefixed("APP_").split("__"));
    let config = PipelineConfig::from_figment(&figment);
    std::env::remove_var("APP_CHUNKING__MAX_CHUNK_SIZE");
    std::env::remove_var("APP_EMBEDDING__FORCE_FALLBACK");

    let config = config.expect("load with env overrides");
    assert_eq!(config.chunking.max_chunk_size, 2048, "env beats file");
    assert!(config.embedding.force_fallback);
}
