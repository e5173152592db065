//! Overlapping fixed-size text chunking.
//!
//! Lengths are counted in characters so CJK text is measured the way it is
//! read. Chunks are contiguous spans of the source: separators stay attached
//! to the chunk they terminate and the repeated prefix of every chunk is
//! recorded in `overlap`, which makes the split exactly reversible.

use medrag_core::config::ChunkingSettings;
use medrag_core::error::{Error, Result};
use medrag_core::types::{Chunk, Document};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingSettings::default().into()
    }
}

impl From<ChunkingSettings> for ChunkingConfig {
    fn from(s: ChunkingSettings) -> Self {
        Self { chunk_size: s.chunk_size, chunk_overlap: s.chunk_overlap, separators: s.separators }
    }
}

/// A piece of text produced by [`Chunker::split_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    /// Leading characters shared with the previous span.
    pub overlap: usize,
}

pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn split_text(&self, text: &str) -> Vec<TextSpan> {
        // bounds[i] is the byte offset of char i; the last entry is text.len()
        let bounds: Vec<usize> = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();
        let n = bounds.len() - 1;
        if n == 0 {
            return Vec::new();
        }
        if n <= self.config.chunk_size {
            return vec![TextSpan { text: text.to_string(), overlap: 0 }];
        }

        let mut spans = Vec::new();
        let mut start = 0usize;
        let mut overlap = 0usize;
        loop {
            let hard_end = (start + self.config.chunk_size).min(n);
            let end = if hard_end == n { n } else { self.break_point(text, &bounds, start, hard_end) };
            spans.push(TextSpan { text: text[bounds[start]..bounds[end]].to_string(), overlap });
            if end == n {
                break;
            }
            let next_start = end.saturating_sub(self.config.chunk_overlap).max(start + 1);
            overlap = end - next_start;
            start = next_start;
        }
        spans
    }

    /// Char index where the chunk starting at `start` should end. The cut
    /// follows the last occurrence of the highest-priority separator that
    /// still leaves room for the overlap, else falls back to `hard_end`.
    fn break_point(&self, text: &str, bounds: &[usize], start: usize, hard_end: usize) -> usize {
        let min_end = start + self.config.chunk_overlap + 1;
        let window = &text[bounds[start]..bounds[hard_end]];
        for sep in self.config.separators.iter().filter(|s| !s.is_empty()) {
            if let Some(pos) = window.rfind(sep.as_str()) {
                let byte_end = bounds[start] + pos + sep.len();
                if let Ok(char_end) = bounds.binary_search(&byte_end) {
                    if char_end >= min_end {
                        return char_end;
                    }
                }
            }
        }
        hard_end
    }

    /// Split one document; chunks inherit its metadata.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let spans = self.split_text(&doc.text);
        let total_chunks = spans.len();
        spans
            .into_iter()
            .enumerate()
            .map(|(chunk_index, span)| Chunk {
                id: format!("{}:{}#{}", doc.metadata.source, doc.metadata.id, chunk_index),
                text: span.text,
                metadata: doc.metadata.clone(),
                chunk_index,
                total_chunks,
                overlap: span.overlap,
            })
            .collect()
    }

    pub fn chunk_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.chunk_document(d)).collect()
    }
}

/// Inverse of [`Chunker::split_text`].
pub fn reconstruct(spans: &[TextSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        out.extend(span.text.chars().skip(span.overlap));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::types::{DocumentMetadata, SourceTag};

    fn chunker(size: usize, overlap: usize, seps: &[&str]) -> Chunker {
        Chunker::new(ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            separators: seps.iter().map(|s| s.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn short_text_is_one_chunk() {
        let spans = chunker(400, 150, &["。"]).split_text("糖尿病患者可以吃水果。");
        assert_eq!(spans, vec![TextSpan { text: "糖尿病患者可以吃水果。".into(), overlap: 0 }]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunker(10, 2, &["。"]).split_text("").is_empty());
    }

    #[test]
    fn prefers_highest_priority_separator() {
        // Both separators fit in the first window; the full stop wins.
        let text = "一二三，四五。六七，八九十甲乙丙丁";
        let spans = chunker(12, 2, &["。", "，"]).split_text(text);
        assert_eq!(spans[0].text, "一二三，四五。");
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn falls_back_to_lower_priority_then_hard_cut() {
        let text = "abcdefgh,ijklmnopqrstuvwxyz";
        let spans = chunker(10, 3, &[".", ","]).split_text(text);
        assert_eq!(spans[0].text, "abcdefgh,");
        assert_eq!(spans[1].overlap, 3);
        assert!(spans[1].text.starts_with("gh,"));
        assert!(spans.iter().all(|s| s.text.chars().count() <= 10));
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn reconstruction_is_exact_for_long_cjk_text() {
        let text = concat!(
            "糖尿病患者每天建議吃兩份水果，一份大約是一個拳頭大小。\n",
            "紅豆屬於全穀雜糧類，喝無糖紅豆湯仍會讓血糖上升。",
        )
        .repeat(20);
        for (size, overlap) in [(400, 150), (50, 10), (7, 6), (3, 0)] {
            let spans = chunker(size, overlap, &["。", "，", "\n"]).split_text(&text);
            assert_eq!(reconstruct(&spans), text, "size={size} overlap={overlap}");
            for pair in spans.windows(2) {
                let prev: Vec<char> = pair[0].text.chars().collect();
                let shared: String = prev[prev.len() - pair[1].overlap..].iter().collect();
                assert!(pair[1].text.starts_with(&shared));
            }
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "胰島素治療，飲食控制。運動，監測血糖。".repeat(30);
        let c = chunker(40, 12, &["。", "，"]);
        assert_eq!(c.split_text(&text), c.split_text(&text));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(Chunker::new(ChunkingConfig { chunk_size: 0, chunk_overlap: 0, separators: vec![] }).is_err());
        assert!(Chunker::new(ChunkingConfig { chunk_size: 5, chunk_overlap: 5, separators: vec![] }).is_err());
    }

    #[test]
    fn chunks_inherit_document_metadata() {
        let doc = Document::new(
            "甲乙丙丁戊。己庚辛壬癸。".repeat(3),
            DocumentMetadata {
                source: SourceTag::PdfArticle,
                id: "qa_p2".into(),
                title: "t".into(),
                page: Some(2),
                path: Some("qa.pdf".into()),
            },
        );
        let chunks = chunker(10, 2, &["。"]).chunk_document(&doc);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.id, format!("pdf_article:qa_p2#{i}"));
            assert_eq!(c.metadata, doc.metadata);
            assert_eq!(c.total_chunks, chunks.len());
        }
        assert_eq!(chunks[0].overlap, 0);
    }
}
