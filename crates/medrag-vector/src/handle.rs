use std::sync::Arc;

use arc_swap::ArcSwapOption;
use medrag_core::error::Error;
use tracing::info;

use crate::index::VectorIndex;

/// Shared slot for the index currently serving queries.
///
/// Readers take a snapshot and keep using it even if a rebuild publishes a
/// new index meanwhile. Until the first publish every snapshot fails with
/// [`Error::IndexNotReady`].
#[derive(Clone)]
pub struct IndexHandle {
    current: Arc<ArcSwapOption<VectorIndex>>,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexHandle {
    pub fn new() -> Self {
        Self { current: Arc::new(ArcSwapOption::empty()) }
    }

    pub fn with_index(index: VectorIndex) -> Self {
        let handle = Self::new();
        handle.publish(index);
        handle
    }

    /// Atomically replace the served index; returns the previous one.
    pub fn publish(&self, index: VectorIndex) -> Option<Arc<VectorIndex>> {
        info!(entries = index.len(), fingerprint = %index.fingerprint(), "publishing index");
        self.current.swap(Some(Arc::new(index)))
    }

    pub fn snapshot(&self) -> Result<Arc<VectorIndex>, Error> {
        self.current.load_full().ok_or(Error::IndexNotReady)
    }
}
