#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod handle;
pub mod index;
pub mod retriever;
pub mod schema;
pub mod store;
pub mod table;

pub use handle::IndexHandle;
pub use index::{corpus_fingerprint, IndexEntry, VectorIndex};
pub use retriever::Retriever;
pub use store::{read_manifest, IndexManifest};
