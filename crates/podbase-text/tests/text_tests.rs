use std::fs;
use tempfile::TempDir;

use podbase_core::types::EpisodeMeta;
use podbase_text::chunker::{clean_text, TextChunker};
use podbase_text::tags::TagExtractor;
use podbase_text::titles::normalize_title;

fn meta() -> EpisodeMeta {
    EpisodeMeta {
        episode_id: 1,
        podcast_id: 1,
        podcast_name: "測試播客".to_string(),
        author: "主持人".to_string(),
        category: "科技".to_string(),
        episode_title: "EP1_測試".to_string(),
        duration: "30:00".to_string(),
        published_date: "2024-01-01".to_string(),
        language: None,
        apple_rating: None,
    }
}

/// ~3,075 characters of 41-char sentences.
fn long_text() -> String {
    let sentence = format!("{}。", "測試內容".repeat(10));
    assert_eq!(sentence.chars().count(), 41);
    sentence.repeat(75)
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}

fn last_chars(s: &str, n: usize) -> String {
    let total = char_count(s);
    s.chars().skip(total.saturating_sub(n)).collect()
}

#[test]
fn long_text_observes_overlap_and_covers_everything() {
    let text = long_text();
    let chunker = TextChunker::new(1024, 100);
    let chunks = chunker.chunk_text(&text);

    assert!(chunks.len() >= 3, "3,000+ chars must split into several chunks");
    for chunk in &chunks {
        assert!(char_count(chunk) <= 1024, "chunk exceeds max size");
    }

    // Each chunk after the first starts with the previous chunk's tail.
    for pair in chunks.windows(2) {
        let expected_overlap = last_chars(&pair[0], 100);
        let head: String = pair[1].chars().take(100).collect();
        assert_eq!(head, expected_overlap, "overlap contract violated");
    }

    // Dropping the 100-char seed from every later chunk reconstructs the
    // original text exactly.
    let mut reconstructed = chunks[0].clone();
    for chunk in &chunks[1..] {
        reconstructed.extend(chunk.chars().skip(100));
    }
    assert_eq!(reconstructed, text);
}

#[test]
fn chunks_carry_ids_and_metadata() {
    let chunker = TextChunker::new(60, 10);
    let text = "第一句話在這裡。第二句話也在這裡。第三句話結束全文。";
    let chunks = chunker.chunk("ep-7", text, &meta());

    assert!(!chunks.is_empty());
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_id, format!("ep-7:{i}"));
        assert_eq!(chunk.chunk_index, i);
        assert_eq!(chunk.chunk_length, chunk.chunk_text.chars().count());
        assert_eq!(chunk.meta.podcast_name, "測試播客");
    }
}

#[test]
fn empty_and_whitespace_input_yield_no_chunks() {
    let chunker = TextChunker::default();
    assert!(chunker.chunk_text("").is_empty());
    assert!(chunker.chunk_text("   \n\t  ").is_empty());
}

#[test]
fn oversized_sentence_is_emitted_unmodified() {
    let chunker = TextChunker::new(50, 10);
    let giant = format!("{}。", "超".repeat(120));
    let text = format!("開頭短句。{giant}結尾短句。");
    let chunks = chunker.chunk_text(&text);

    assert!(
        chunks.iter().any(|c| c.contains(&giant)),
        "oversized sentence must survive whole"
    );
    let giant_chunk = chunks.iter().find(|c| c.contains(&giant)).unwrap();
    assert!(char_count(giant_chunk) > 50, "overflow chunk is allowed past max");
    for chunk in &chunks {
        if !chunk.contains(&giant) {
            assert!(char_count(chunk) <= 50);
        }
    }
}

#[test]
fn overlap_seed_skipped_when_it_would_overflow() {
    // max 30, overlap 20: a 25-char sentence cannot share a chunk with a
    // 20-char seed, so the seed is dropped and the bound holds.
    let chunker = TextChunker::new(30, 20);
    let first = format!("{}。", "甲".repeat(24));
    let second = format!("{}。", "乙".repeat(24));
    let chunks = chunker.chunk_text(&format!("{first}{second}"));

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], first);
    assert_eq!(chunks[1], second, "seed dropped, length bound wins");
}

#[test]
fn clean_text_unifies_endings_and_collapses_blanks() {
    let cleaned = clean_text("第一行\r\n\r\n\r\n第二行\r尾端  ");
    assert_eq!(cleaned, "第一行\n\n第二行\n尾端");
}

#[test]
fn taxonomy_union_truncates_to_three_in_first_seen_order() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("taxonomy.tsv");
    fs::write(
        &path,
        "keyword\tmain_category\tsub_category\ttags\tweight\n\
         人工智慧\t科技\tAI\tAI,機器學習\t1.0\n\
         投資\t財經\t理財\t投資理財,股市分析\t0.9\n",
    )
    .unwrap();

    let extractor = TagExtractor::from_taxonomy_file(&path).expect("load taxonomy");
    assert_eq!(extractor.taxonomy_len(), 2);

    let tags = extractor.extract_tags("這集我們聊人工智慧和投資的關係。");
    assert_eq!(tags, vec!["AI", "機器學習", "投資理財"]);
}

#[test]
fn tags_never_exceed_three_and_never_come_back_empty() {
    let extractor = TagExtractor::new();
    let inputs = [
        "".to_string(),
        "短".to_string(),
        "這集聊 AI 與投資還有健康與科技與創業".to_string(),
        "字".repeat(700),
    ];
    for text in &inputs {
        let tags = extractor.extract_tags(text);
        assert!(tags.len() <= 3, "more than three tags for {text:?}");
        assert!(!tags.is_empty(), "no tags for {text:?}");
    }
}

#[test]
fn tiers_fall_through_in_order() {
    let extractor = TagExtractor::new();

    // no taxonomy, heuristic hit
    assert_eq!(extractor.extract_tags("今天聊投資策略。"), vec!["投資理財"]);

    // no keyword anywhere: length fallback
    assert_eq!(extractor.extract_tags("早安。"), vec!["短文本"]);
    let long = "聊".repeat(600);
    assert_eq!(extractor.extract_tags(&long), vec!["長文本", "詳細內容"]);
}

#[test]
fn taxonomy_tier_shadows_heuristics() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("taxonomy.tsv");
    fs::write(&path, "投資\t財經\t理財\t價值投資\t1.0\n").unwrap();

    let extractor = TagExtractor::from_taxonomy_file(&path).expect("load taxonomy");
    // taxonomy matched, so the heuristic "投資理財" must not appear
    assert_eq!(extractor.extract_tags("投資要有紀律。"), vec!["價值投資"]);
}

#[test]
fn taxonomy_load_rejects_unusable_files() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("taxonomy.tsv");
    fs::write(&path, "# only comments\n\n").unwrap();
    assert!(TagExtractor::from_taxonomy_file(&path).is_err());
    assert!(TagExtractor::from_taxonomy_file(&tmp.path().join("absent.tsv")).is_err());
}

#[test]
fn normalization_is_shared_and_idempotent() {
    let raw = "Ep.2 Bitter food better health";
    let canonical = normalize_title(raw);
    assert_eq!(canonical, "EP2_Bitter_food_better_health");
    assert_eq!(normalize_title(&canonical), canonical);

    // separators the strip rule removes must not delay the marker
    for raw in ["Ep#2 foo", "Ep(2) 苦味", "ep:3 news"] {
        let once = normalize_title(raw);
        assert_eq!(normalize_title(&once), once, "not idempotent for {raw:?}");
    }
    assert_eq!(normalize_title("Ep#2 foo"), "EP2_foo");
}
