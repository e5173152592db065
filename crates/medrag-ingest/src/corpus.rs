//! Assembles the configured sources into documents and chunks.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use medrag_core::config::{ChunkingSettings, DataSettings};
use medrag_core::types::{Chunk, Document};
use tracing::info;

use crate::chunker::Chunker;
use crate::loader;

/// Source files grouped by loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusSources {
    pub article_csvs: Vec<PathBuf>,
    pub qa_csvs: Vec<PathBuf>,
    /// Loaded as articles unless their first pages look like Q&A.
    pub pdf_articles: Vec<PathBuf>,
    pub pdf_qa: Vec<PathBuf>,
}

impl CorpusSources {
    /// Explicitly listed files first, then anything found under `corpus_dir`
    /// that was not already listed.
    pub fn from_settings(data: &DataSettings) -> Self {
        let mut sources = Self {
            article_csvs: data.article_csvs.clone(),
            qa_csvs: data.qa_csvs.clone(),
            pdf_articles: data.pdf_articles.clone(),
            pdf_qa: data.pdf_qa.clone(),
        };
        if let Some(dir) = &data.corpus_dir {
            sources.merge(Self::discover(dir));
        }
        sources
    }

    /// Walk `root` for `*.csv` and `*.pdf`. CSVs with question and answer
    /// columns are Q&A tables; every PDF goes through auto-detection.
    pub fn discover(root: &Path) -> Self {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();

        let mut sources = Self::default();
        for path in files {
            let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
            match ext.as_deref() {
                Some("csv") if loader::csv_has_qa_columns(&path) => sources.qa_csvs.push(path),
                Some("csv") => sources.article_csvs.push(path),
                Some("pdf") => sources.pdf_articles.push(path),
                _ => {}
            }
        }
        info!(root = %root.display(), files = sources.len(), "discovered corpus files");
        sources
    }

    fn merge(&mut self, other: Self) {
        let mut seen: BTreeSet<PathBuf> = self.all().cloned().collect();
        let mut add = |into: &mut Vec<PathBuf>, from: Vec<PathBuf>| {
            for p in from {
                if seen.insert(p.clone()) {
                    into.push(p);
                }
            }
        };
        add(&mut self.article_csvs, other.article_csvs);
        add(&mut self.qa_csvs, other.qa_csvs);
        add(&mut self.pdf_articles, other.pdf_articles);
        add(&mut self.pdf_qa, other.pdf_qa);
    }

    fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.article_csvs.iter().chain(&self.qa_csvs).chain(&self.pdf_articles).chain(&self.pdf_qa)
    }

    pub fn len(&self) -> usize {
        self.all().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load every source. Unreadable sources contribute nothing.
pub fn load_corpus(sources: &CorpusSources) -> Vec<Document> {
    let mut docs = Vec::new();
    for path in &sources.article_csvs {
        docs.extend(loader::load_article_csv(path));
    }
    for path in &sources.qa_csvs {
        docs.extend(loader::load_qa_csv(path));
    }
    for path in &sources.pdf_articles {
        docs.extend(loader::load_pdf_auto(path));
    }
    for path in &sources.pdf_qa {
        docs.extend(loader::load_pdf_qa(path));
    }
    info!(sources = sources.len(), documents = docs.len(), "corpus loaded");
    docs
}

/// Load and chunk the configured corpus.
pub fn ingest(data: &DataSettings, chunking: &ChunkingSettings) -> anyhow::Result<Vec<Chunk>> {
    let chunker = Chunker::new(chunking.clone().into()).context("invalid chunking settings")?;
    let docs = load_corpus(&CorpusSources::from_settings(data));
    let chunks = chunker.chunk_documents(&docs);
    info!(documents = docs.len(), chunks = chunks.len(), "corpus chunked");
    Ok(chunks)
}
