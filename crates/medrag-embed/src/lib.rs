#![deny(unused_imports)]
#![deny(unused_variables)]

use std::sync::Arc;

use anyhow::Result;
use medrag_core::config::EmbeddingSettings;
use medrag_core::traits::Embedder;
use tracing::info;

pub mod bert;
pub mod device;
pub mod fake;
pub mod pool;
pub mod tokenize;

pub use bert::BertEmbedder;
pub use device::select_device;
pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;

/// `APP_USE_FAKE_EMBEDDINGS=1|true` forces the fake embedder regardless of config.
pub fn fake_requested_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The process-wide embedder: the BERT model, or the fake one when configured.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.fake || fake_requested_by_env() {
        info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    Ok(Arc::new(BertEmbedder::new(settings)?))
}
