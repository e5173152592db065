use crate::error::Error;
use crate::types::ScoredChunk;

/// Text → dense vector. Implementations are expensive to construct and cheap
/// to call; one instance is shared for the lifetime of the process.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `bert:sbert-chinese-general-v2:d768`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    /// Embed each text independently; output order matches input order.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Fixed-k retrieval seam used by the answer pipeline.
pub trait Retrieve: Send + Sync {
    fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, Error>;
}
