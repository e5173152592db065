#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod chunker;
pub mod corpus;
pub mod loader;
pub mod pdf;
pub mod qa_split;

pub use chunker::{Chunker, ChunkingConfig};
pub use corpus::{ingest, load_corpus, CorpusSources};
pub use qa_split::{split_into_qa_pairs, QaPair};
