//! Sentence-boundary chunking with sliding-window overlap.
//!
//! Transcripts are mixed Chinese/English, so every length here counts
//! characters, never bytes. Sentences are never split: a chunk closes when
//! the next sentence would push it past `max_chunk_size`, and the next chunk
//! starts with the trailing `overlap` characters of the previous one so
//! context carries across the boundary.

use podbase_core::types::{chunk_id_for, Chunk, EpisodeMeta};

/// Characters that end a sentence, half-width and full-width.
const SENTENCE_TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

#[derive(Debug, Clone)]
pub struct TextChunker {
    max_chunk_size: usize,
    overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            max_chunk_size: 1024,
            overlap: 100,
        }
    }
}

impl TextChunker {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            overlap,
        }
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk a document's text into [`Chunk`]s carrying the episode metadata.
    /// Empty or whitespace-only input yields no chunks.
    pub fn chunk(&self, document_id: &str, text: &str, meta: &EpisodeMeta) -> Vec<Chunk> {
        self.chunk_text(text)
            .into_iter()
            .enumerate()
            .map(|(index, chunk_text)| Chunk {
                chunk_id: chunk_id_for(document_id, index),
                chunk_index: index,
                chunk_length: char_len(&chunk_text),
                chunk_text,
                meta: meta.clone(),
            })
            .collect()
    }

    /// The chunking core: sentence accumulation with overlap seeding.
    ///
    /// A sentence longer than `max_chunk_size` becomes its own chunk,
    /// unmodified; truncating mid-sentence would lose transcript content.
    /// The overlap seed is dropped when seed + next sentence would itself
    /// exceed `max_chunk_size`, keeping the length bound authoritative.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut buf = String::new();
        // Sentences appended since the last overlap seed; a buffer holding
        // only the seed is never emitted as a chunk.
        let mut fresh = 0usize;

        for sentence in sentences {
            let sentence_len = char_len(&sentence);
            if fresh > 0 && char_len(&buf) + sentence_len > self.max_chunk_size {
                let closed = std::mem::take(&mut buf);
                let tail = char_tail(&closed, self.overlap);
                chunks.push(closed);
                if self.overlap > 0 && char_len(&tail) + sentence_len <= self.max_chunk_size {
                    buf = tail;
                }
                fresh = 0;
            }
            buf.push_str(&sentence);
            fresh += 1;
        }
        if fresh > 0 {
            chunks.push(buf);
        }
        chunks
    }
}

/// Normalize raw transcript text before chunking: unify line endings, drop
/// control characters, and collapse blank-line runs.
pub fn clean_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.lines() {
        let line: String = line
            .chars()
            .filter(|c| !c.is_control() || *c == '\t')
            .collect();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out.trim().to_string()
}

/// Split text into sentences, each keeping its terminator. Text after the
/// last terminator becomes a final unterminated sentence, unless it is
/// whitespace-only.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut buf = String::new();
    for c in text.chars() {
        buf.push(c);
        if SENTENCE_TERMINATORS.contains(&c) {
            sentences.push(std::mem::take(&mut buf));
        }
    }
    if !buf.trim().is_empty() {
        sentences.push(buf);
    }
    sentences
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `n` characters of `s` as an owned string.
fn char_tail(s: &str, n: usize) -> String {
    let total = char_len(s);
    if total <= n {
        return s.to_string();
    }
    s.chars().skip(total - n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_terminators() {
        let sentences = split_sentences("今天聊台積電。財報很好！你覺得呢？");
        assert_eq!(sentences, vec!["今天聊台積電。", "財報很好！", "你覺得呢？"]);
    }

    #[test]
    fn split_handles_trailing_fragment() {
        let sentences = split_sentences("First sentence. trailing words");
        assert_eq!(sentences, vec!["First sentence.", " trailing words"]);
    }

    #[test]
    fn tail_counts_characters() {
        assert_eq!(char_tail("一二三四五", 2), "四五");
        assert_eq!(char_tail("ab", 5), "ab");
    }
}
