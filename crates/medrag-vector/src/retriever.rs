use medrag_core::error::Error;
use medrag_core::traits::Retrieve;
use medrag_core::types::ScoredChunk;
use tracing::debug;

use crate::handle::IndexHandle;

/// Fixed-k similarity retrieval against the published index.
pub struct Retriever {
    handle: IndexHandle,
    k: usize,
}

impl Retriever {
    pub fn new(handle: IndexHandle, k: usize) -> Result<Self, Error> {
        if k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be at least 1".into()));
        }
        Ok(Self { handle, k })
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Retrieve for Retriever {
    fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, Error> {
        let index = self.handle.snapshot()?;
        let hits = index
            .query(query, self.k)
            .map_err(|e| Error::ModelUnavailable(format!("query embedding failed: {e}")))?;
        debug!(k = self.k, hits = hits.len(), "retrieved");
        Ok(hits)
    }
}
