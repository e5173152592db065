#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{Chunk, ChunkId, Document, DocumentMetadata, ScoredChunk, SourceTag};
