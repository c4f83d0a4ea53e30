//! Tiered tag extraction.
//!
//! Three tiers, each consulted only when the previous found nothing:
//! a curated taxonomy loaded from TSV, a small built-in keyword table, and
//! a length-based fallback. Extraction itself never fails; only taxonomy
//! loading can error, and the caller decides whether that is fatal.

use anyhow::Context;
use podbase_core::error::{PipelineError, Result};
use podbase_core::types::MAX_TAGS;
use std::path::Path;

/// Longest tag kept after validation, in characters.
const MAX_TAG_LEN: usize = 20;

/// Chunks longer than this are tagged as long-form content by the fallback
/// tier.
const LONG_TEXT_CHARS: usize = 500;
const MEDIUM_TEXT_CHARS: usize = 100;

/// Built-in keyword table, the second tier. Matching is a case-insensitive
/// substring check in table order.
const HEURISTIC_KEYWORDS: [(&str, &str); 14] = [
    ("人工智慧", "AI人工智慧"),
    ("ai", "AI人工智慧"),
    ("投資", "投資理財"),
    ("股票", "股票市場"),
    ("理財", "投資理財"),
    ("健康", "健康生活"),
    ("醫療", "健康生活"),
    ("科技", "科技趨勢"),
    ("創業", "創業商業"),
    ("職場", "職場成長"),
    ("心理", "心理成長"),
    ("教育", "學習教育"),
    ("音樂", "音樂藝文"),
    ("電影", "影視娛樂"),
];

/// One row of the curated taxonomy.
#[derive(Debug, Clone)]
pub struct TaxonomyEntry {
    pub keyword: String,
    pub main_category: String,
    pub sub_category: String,
    pub tags: Vec<String>,
    pub weight: f32,
}

/// Keyword-driven tag extractor. Construct once per run; matching is
/// deterministic for a fixed taxonomy.
#[derive(Debug, Default)]
pub struct TagExtractor {
    taxonomy: Vec<TaxonomyEntry>,
}

impl TagExtractor {
    /// Extractor with no taxonomy: tier 1 is empty, tiers 2 and 3 still
    /// guarantee at least one tag per chunk.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taxonomy(taxonomy: Vec<TaxonomyEntry>) -> Self {
        Self { taxonomy }
    }

    /// Load the taxonomy from a TSV file with columns
    /// `keyword<TAB>main_category<TAB>sub_category<TAB>tags<TAB>weight`,
    /// where `tags` is comma-separated and `weight` is optional. Lines
    /// starting with `#`, a header line, and rows with too few columns are
    /// skipped.
    pub fn from_taxonomy_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read taxonomy {}", path.display()))
            .map_err(|e| PipelineError::TagExtraction(format!("{e:#}")))?;

        let mut taxonomy = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 4 {
                tracing::warn!(
                    line = lineno + 1,
                    "skipping taxonomy row with {} columns",
                    fields.len()
                );
                continue;
            }
            if taxonomy.is_empty() && fields[0].eq_ignore_ascii_case("keyword") {
                continue;
            }
            let tags: Vec<String> = fields[3]
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if tags.is_empty() {
                tracing::warn!(line = lineno + 1, "skipping taxonomy row without tags");
                continue;
            }
            let weight = fields
                .get(4)
                .and_then(|w| w.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            taxonomy.push(TaxonomyEntry {
                keyword: fields[0].to_string(),
                main_category: fields[1].to_string(),
                sub_category: fields[2].to_string(),
                tags,
                weight,
            });
        }

        if taxonomy.is_empty() {
            return Err(PipelineError::TagExtraction(format!(
                "taxonomy {} contains no usable rows",
                path.display()
            )));
        }
        tracing::info!(entries = taxonomy.len(), "loaded tag taxonomy");
        Ok(Self { taxonomy })
    }

    pub fn taxonomy_len(&self) -> usize {
        self.taxonomy.len()
    }

    /// Extract at most [`MAX_TAGS`] tags for a chunk. Always returns at
    /// least one tag thanks to the length fallback tier.
    pub fn extract_tags(&self, chunk_text: &str) -> Vec<String> {
        let haystack = chunk_text.to_lowercase();

        let mut tags = self.taxonomy_tags(&haystack);
        if tags.is_empty() {
            tags = heuristic_tags(&haystack);
        }
        if tags.is_empty() {
            tags = length_fallback_tags(chunk_text);
        }
        tags
    }

    /// Tier 1: union of tag sets of every taxonomy keyword found in the
    /// chunk, in first-seen order, truncated to [`MAX_TAGS`].
    fn taxonomy_tags(&self, haystack: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for entry in &self.taxonomy {
            if !haystack.contains(&entry.keyword.to_lowercase()) {
                continue;
            }
            for tag in &entry.tags {
                if out.len() >= MAX_TAGS {
                    return out;
                }
                if let Some(valid) = validate_tag(tag) {
                    if !out.contains(&valid) {
                        out.push(valid);
                    }
                }
            }
        }
        out
    }
}

/// Tier 2: built-in keyword table.
fn heuristic_tags(haystack: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (keyword, tag) in HEURISTIC_KEYWORDS {
        if out.len() >= MAX_TAGS {
            break;
        }
        if haystack.contains(keyword) {
            if let Some(valid) = validate_tag(tag) {
                if !out.contains(&valid) {
                    out.push(valid);
                }
            }
        }
    }
    out
}

/// Tier 3: every chunk gets at least one tag based on its character count.
fn length_fallback_tags(chunk_text: &str) -> Vec<String> {
    let chars = chunk_text.chars().count();
    if chars > LONG_TEXT_CHARS {
        vec!["長文本".to_string(), "詳細內容".to_string()]
    } else if chars > MEDIUM_TEXT_CHARS {
        vec!["中等文本".to_string()]
    } else {
        vec!["短文本".to_string()]
    }
}

/// Keep letters and digits (covers CJK), cap the length, drop what's left
/// empty. Returns `None` for tags that do not survive.
pub fn validate_tag(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(MAX_TAG_LEN)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_strips_punctuation_and_caps_length() {
        assert_eq!(validate_tag("AI-人工.智慧!"), Some("AI人工智慧".to_string()));
        assert_eq!(validate_tag("!!!"), None);
        let long = "字".repeat(30);
        assert_eq!(validate_tag(&long).map(|t| t.chars().count()), Some(20));
    }

    #[test]
    fn heuristic_table_matches_case_insensitively() {
        let tags = heuristic_tags(&"這集聊 AI 應用".to_lowercase());
        assert_eq!(tags, vec!["AI人工智慧"]);
    }

    #[test]
    fn length_fallback_buckets() {
        assert_eq!(length_fallback_tags("短"), vec!["短文本"]);
        let medium = "中".repeat(200);
        assert_eq!(length_fallback_tags(&medium), vec!["中等文本"]);
        let long = "長".repeat(600);
        assert_eq!(length_fallback_tags(&long), vec!["長文本", "詳細內容"]);
    }
}
