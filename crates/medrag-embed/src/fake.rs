use std::hash::{Hash, Hasher};

use anyhow::Result;
use medrag_core::traits::Embedder;
use twox_hash::XxHash64;

/// Deterministic hashed bag-of-tokens vectors for tests and offline work.
/// ASCII words are hashed whole; every other non-space character (CJK) is
/// its own token so related Chinese sentences share dimensions.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("fake:xxhash:d{dim}") }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in tokens(text).enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    let mut out = Vec::new();
    let mut word_start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c.is_ascii_alphanumeric() {
            if word_start.is_none() {
                word_start = Some(i);
            }
            continue;
        }
        if let Some(s) = word_start.take() {
            out.push(&text[s..i]);
        }
        if !c.is_whitespace() && !c.is_ascii_punctuation() {
            out.push(&text[i..i + c.len_utf8()]);
        }
    }
    if let Some(s) = word_start {
        out.push(&text[s..]);
    }
    out.into_iter()
}

impl Embedder for FakeEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}
