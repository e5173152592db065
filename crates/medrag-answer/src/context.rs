use medrag_core::types::ScoredChunk;

/// Joins retrieved chunks into the context block of the prompt.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    pub delimiter: String,
    pub sort_by_score: bool,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self { delimiter: "\n---\n".to_string(), sort_by_score: true }
    }
}

impl ContextAssembler {
    /// Chunk texts, best score first when sorting is on (missing scores count
    /// as 0, equal scores keep their order). No dedup, no length cap.
    pub fn assemble(&self, chunks: &[ScoredChunk]) -> String {
        let mut ordered: Vec<&ScoredChunk> = chunks.iter().collect();
        if self.sort_by_score {
            ordered.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
        }
        ordered.iter().map(|c| c.chunk.text.as_str()).collect::<Vec<_>>().join(&self.delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::types::{Chunk, DocumentMetadata, SourceTag};

    fn scored(text: &str, score: Option<f32>) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: text.to_string(),
                text: text.to_string(),
                metadata: DocumentMetadata {
                    source: SourceTag::Answers,
                    id: "0".into(),
                    title: "t".into(),
                    page: None,
                    path: None,
                },
                chunk_index: 0,
                total_chunks: 1,
                overlap: 0,
            },
            score,
        }
    }

    #[test]
    fn empty_and_single() {
        let a = ContextAssembler::default();
        assert_eq!(a.assemble(&[]), "");
        assert_eq!(a.assemble(&[scored("只有一段", Some(0.2))]), "只有一段");
    }

    #[test]
    fn sorts_descending_with_missing_scores_as_zero() {
        let a = ContextAssembler::default();
        let chunks =
            [scored("low", Some(0.1)), scored("none", None), scored("high", Some(0.9)), scored("neg", Some(-0.2))];
        assert_eq!(a.assemble(&chunks), "high\n---\nlow\n---\nnone\n---\nneg");
    }

    #[test]
    fn ties_and_unsorted_keep_input_order() {
        let chunks = [scored("a", None), scored("b", Some(0.0)), scored("c", None)];
        assert_eq!(ContextAssembler::default().assemble(&chunks), "a\n---\nb\n---\nc");
        let plain = ContextAssembler { delimiter: " | ".into(), sort_by_score: false };
        assert_eq!(plain.assemble(&[scored("x", Some(0.1)), scored("y", Some(0.9))]), "x | y");
    }
}
