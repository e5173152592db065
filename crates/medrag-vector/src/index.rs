//! Exact cosine nearest-neighbour index over embedded chunks.
//!
//! The index is immutable once built. Results are ordered by similarity,
//! highest first, with ties resolved by insertion order.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use medrag_core::traits::Embedder;
use medrag_core::types::{Chunk, ScoredChunk};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    embedder: Arc<dyn Embedder>,
    fingerprint: String,
    built_at: DateTime<Utc>,
}

/// Digest of the embedder id and every chunk id and text, in order. Two
/// indexes with the same fingerprint hold the same vectors.
pub fn corpus_fingerprint(chunks: &[Chunk], embedder_id: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(embedder_id.as_bytes());
    for chunk in chunks {
        hasher.update(&[0]);
        hasher.update(chunk.id.as_bytes());
        hasher.update(&[0]);
        hasher.update(chunk.text.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

impl VectorIndex {
    /// Embed every chunk in batches of `batch_size`. Any embedding failure
    /// aborts the build.
    pub fn build(chunks: Vec<Chunk>, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
        let fingerprint = corpus_fingerprint(&chunks, embedder.id());
        let dim = embedder.dim();
        info!(chunks = chunks.len(), embedder = embedder.id(), "building vector index");

        let pb = progress_bar(chunks.len());
        let mut entries = Vec::with_capacity(chunks.len());
        let mut pending = chunks.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(batch_size.max(1)).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(anyhow!("embedder returned {} vectors for {} texts", vectors.len(), batch.len()));
            }
            for (chunk, vector) in batch.into_iter().zip(vectors) {
                if vector.len() != dim {
                    return Err(anyhow!("dim mismatch for {}: got {} expected {}", chunk.id, vector.len(), dim));
                }
                entries.push(IndexEntry { chunk, vector });
            }
            pb.set_position(entries.len() as u64);
        }
        pb.finish_with_message("index built");
        info!(entries = entries.len(), "vector index ready");
        Ok(Self { entries, embedder, fingerprint, built_at: Utc::now() })
    }

    pub(crate) fn from_parts(
        entries: Vec<IndexEntry>,
        embedder: Arc<dyn Embedder>,
        fingerprint: String,
        built_at: DateTime<Utc>,
    ) -> Self {
        Self { entries, embedder, fingerprint, built_at }
    }

    /// Embed `text` and return the `k` closest chunks.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let q = self.embedder.embed(text)?;
        Ok(self.query_vec(&q, k))
    }

    pub fn query_vec(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> =
            self.entries.iter().enumerate().map(|(i, e)| (i, cosine(query, &e.vector))).collect();
        // stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        debug!(k, returned = scored.len(), top = scored.first().map(|s| s.1), "vector query");
        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: self.entries[i].chunk.clone(), score: Some(score) })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn embedder_id(&self) -> &str {
        self.embedder.id()
    }

    pub fn dim(&self) -> usize {
        self.embedder.dim()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
