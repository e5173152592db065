//! Domain types shared by ingestion, indexing and answering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ChunkId = String;

/// Where a document came from. Serialized with the tag names used in the
/// persisted index (`articles`, `pdf_questions`, ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Articles,
    Questions,
    Answers,
    PdfArticle,
    PdfQuestions,
    PdfAnswers,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Articles => "articles",
            SourceTag::Questions => "questions",
            SourceTag::Answers => "answers",
            SourceTag::PdfArticle => "pdf_article",
            SourceTag::PdfQuestions => "pdf_questions",
            SourceTag::PdfAnswers => "pdf_answers",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "articles" => Ok(SourceTag::Articles),
            "questions" => Ok(SourceTag::Questions),
            "answers" => Ok(SourceTag::Answers),
            "pdf_article" => Ok(SourceTag::PdfArticle),
            "pdf_questions" => Ok(SourceTag::PdfQuestions),
            "pdf_answers" => Ok(SourceTag::PdfAnswers),
            other => Err(crate::error::Error::Storage(format!("unknown source tag '{other}'"))),
        }
    }
}

/// Provenance attached to every document and inherited by its chunks.
///
/// - `id`: row index for tabular sources, `{stem}_p{n}[_q{j}|_a{j}]` for PDFs
/// - `page`: 1-based PDF page, `None` for tabular sources
/// - `path`: source file path for PDFs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: SourceTag,
    pub id: String,
    pub title: String,
    pub page: Option<u32>,
    pub path: Option<String>,
}

/// A normalized text record produced by the loader. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self { text: text.into(), metadata }
    }
}

/// A bounded span of a document's text, the atomic retrieval unit.
///
/// `overlap` counts the leading characters repeated from the previous chunk
/// of the same document, so `text.chars().skip(overlap)` is the new material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: DocumentMetadata,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub overlap: usize,
}

/// One retrieval result. `score` is cosine similarity (higher is better);
/// chunks assembled from other sources may carry no score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: Option<f32>,
}
