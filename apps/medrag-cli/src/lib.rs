//! Shared start-up for the `medrag-*` binaries.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use medrag_core::config::{Config, Settings};
use medrag_core::types::Chunk;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const EXIT_WORDS: [&str; 4] = ["exit", "quit", "退出", "結束"];

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn load_settings(config_dir: &Path) -> Result<Settings> {
    let config = Config::load_from(config_dir)
        .with_context(|| format!("failed to load config from {}", config_dir.display()))?;
    config.settings()
}

/// Refuse to index an empty corpus. Saving it would replace a good index
/// whenever every source is missing or unreadable.
pub fn ensure_corpus(chunks: &[Chunk]) -> Result<()> {
    if chunks.is_empty() {
        tracing::error!("no usable documents found in any configured source");
        bail!("no usable documents found; refusing to build an empty index");
    }
    Ok(())
}

pub fn is_exit_word(line: &str) -> bool {
    let line = line.trim();
    EXIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
}

/// One question per non-blank line.
pub fn read_questions(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}
