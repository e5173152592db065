use std::path::PathBuf;

use clap::Parser;
use medrag_cli::{ensure_corpus, init_tracing, load_settings};
use medrag_embed::get_default_embedder;
use medrag_vector::{corpus_fingerprint, read_manifest, VectorIndex};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "medrag-indexer", about = "Build the vector index from the configured corpus")]
struct Args {
    /// Rebuild even when the saved index matches the corpus.
    #[arg(long)]
    rebuild: bool,

    /// Directory holding config.toml.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings(&args.config_dir)?;
    let index_dir = settings.data.index_dir.clone();

    println!("Medical corpus indexer\n======================");
    println!("Index directory: {}", index_dir.display());

    let chunks = medrag_ingest::ingest(&settings.data, &settings.chunking)?;
    ensure_corpus(&chunks)?;
    let embedder = get_default_embedder(&settings.embedding)?;
    let fingerprint = corpus_fingerprint(&chunks, embedder.id());

    let rt = tokio::runtime::Runtime::new()?;
    if !args.rebuild {
        if let Some(manifest) = rt.block_on(read_manifest(&index_dir))? {
            if manifest.fingerprint == fingerprint {
                info!(entries = manifest.entries, built_at = %manifest.built_at, "index is up to date");
                println!("✅ Index is up to date ({} chunks), use --rebuild to force", manifest.entries);
                return Ok(());
            }
            info!(old = %manifest.fingerprint, new = %fingerprint, "corpus changed, rebuilding");
        }
    }

    let total = chunks.len();
    let index = VectorIndex::build(chunks, embedder, settings.embedding.batch_size)?;
    rt.block_on(index.save(&index_dir))?;

    println!("\n✅ Indexing completed successfully!");
    println!("📊 Indexed {} chunks (dim {}) from {}", total, index.dim(), index.embedder_id());
    println!("\n💡 To ask questions, use: cargo run --bin medrag-chat -- --question '<question>'");
    Ok(())
}
