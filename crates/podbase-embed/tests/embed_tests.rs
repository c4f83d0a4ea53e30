use podbase_core::config::EmbeddingConfig;
use podbase_core::types::TAG_SLOTS;
use podbase_embed::{EmbedOutcome, EmbeddingGenerator, FALLBACK_MODEL};

fn fallback_config(dimension: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        model_dir: None,
        dimension,
        max_len: 32,
        force_fallback: true,
    }
}

#[test]
fn fallback_generator_holds_the_dimension_invariant() {
    let generator = EmbeddingGenerator::new(&fallback_config(1024));
    assert!(generator.is_degraded());

    for text in ["", "hello", "今天聊台積電的財報與展望。", &"長".repeat(3000)] {
        let outcome = generator.encode(text);
        assert_eq!(outcome.vector().len(), 1024, "dimension must be fixed");
        assert!(outcome.is_fallback());
        assert_eq!(outcome.source_model(), FALLBACK_MODEL);
    }
}

#[test]
fn fallback_values_are_deterministic_and_bounded() {
    let generator = EmbeddingGenerator::new(&fallback_config(64));
    let a = generator.encode("股癌 EP33 護國神山").into_vector();
    let b = generator.encode("股癌 EP33 護國神山").into_vector();
    assert_eq!(a, b, "same input, same vector");
    assert!(a.iter().all(|x| (0.0..=1.0).contains(x)));

    let c = generator.encode("完全不同的內容").into_vector();
    assert_ne!(a, c, "different input, different vector");
}

#[test]
fn batch_preserves_order_one_to_one() {
    let generator = EmbeddingGenerator::new(&fallback_config(16));
    let texts = vec!["第一段", "第二段", "第三段"];
    let outcomes = generator.encode_batch(&texts);
    assert_eq!(outcomes.len(), texts.len());
    for (text, outcome) in texts.iter().zip(&outcomes) {
        assert_eq!(outcome.vector(), generator.encode(text).vector());
    }
}

#[test]
fn missing_model_dir_degrades_instead_of_failing() {
    let config = EmbeddingConfig {
        model_dir: Some("/nonexistent/bge-m3".to_string()),
        dimension: 32,
        max_len: 16,
        force_fallback: false,
    };
    let generator = EmbeddingGenerator::new(&config);
    assert!(generator.is_degraded(), "broken model dir must not abort");
    let outcome = generator.encode("text");
    assert!(matches!(outcome, EmbedOutcome::Fallback { .. }));
    assert!(outcome.reason().is_some());
}

#[test]
fn tag_slots_pad_with_text_embedding() {
    let generator = EmbeddingGenerator::new(&fallback_config(8));
    let text_embedding = generator.encode("本集逐字稿內容").into_vector();

    let one_tag = generator.encode_tag_slots(&["投資理財".to_string()], &text_embedding);
    assert_eq!(one_tag.len(), TAG_SLOTS);
    assert_eq!(one_tag[0], generator.encode("投資理財").into_vector());
    assert_eq!(one_tag[1], text_embedding);
    assert_eq!(one_tag[2], text_embedding);

    let no_tags = generator.encode_tag_slots(&[], &text_embedding);
    assert_eq!(no_tags, vec![text_embedding.clone(); TAG_SLOTS]);

    let many: Vec<String> = ["甲", "乙", "丙", "丁"].iter().map(|s| s.to_string()).collect();
    let capped = generator.encode_tag_slots(&many, &text_embedding);
    assert_eq!(capped.len(), TAG_SLOTS, "never more than the fixed slot count");
    for (slot, tag) in capped.iter().zip(&many) {
        assert_eq!(slot, &generator.encode(tag).into_vector());
    }
}
