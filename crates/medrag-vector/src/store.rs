//! Persistence of a [`VectorIndex`] as a LanceDB directory.
//!
//! Layout: a `chunks` table holding every entry with its vector, and a `meta`
//! key/value table (embedder id, dimension, corpus fingerprint, build time).
//! Saving writes a sibling staging directory and renames it over the target,
//! so readers never see a half-written index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray,
};
use chrono::{DateTime, Utc};
use lancedb::query::ExecutableQuery;
use medrag_core::error::Error;
use medrag_core::traits::Embedder;
use medrag_core::types::{Chunk, DocumentMetadata, SourceTag};
use tracing::{info, warn};

use crate::index::{IndexEntry, VectorIndex};
use crate::schema::{build_chunks_schema, CHUNKS_TABLE};
use crate::table::{create_empty, open_db, read_meta, write_meta};

const WRITE_BATCH: usize = 1000;

const KEY_EMBEDDER: &str = "embedder_id";
const KEY_DIM: &str = "dim";
const KEY_FINGERPRINT: &str = "corpus_fingerprint";
const KEY_BUILT_AT: &str = "built_at";
const KEY_ENTRIES: &str = "entries";

/// What a saved index was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexManifest {
    pub embedder_id: String,
    pub dim: usize,
    pub fingerprint: String,
    pub built_at: String,
    pub entries: usize,
}

fn sibling(dir: &Path, tag: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| anyhow!("index dir {} has no file name", dir.display()))?
        .to_string_lossy();
    Ok(dir.with_file_name(format!(".{name}.{tag}-{}", Utc::now().timestamp_millis())))
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_dir_all(path) {
            warn!(path = %path.display(), error = %e, "could not remove staging dir");
        }
    }
}

/// Move `staging` to `dir`. The previous `dir` is removed only once the new
/// one is in place; on failure it is restored and `staging` is discarded.
fn swap_into_place(staging: &Path, dir: &Path) -> Result<()> {
    let backup = if dir.exists() {
        let backup = sibling(dir, "old")?;
        if let Err(e) = std::fs::rename(dir, &backup) {
            discard(staging);
            return Err(anyhow!(e).context(format!("moving aside {}", dir.display())));
        }
        Some(backup)
    } else {
        None
    };
    if let Err(e) = std::fs::rename(staging, dir) {
        discard(staging);
        if let Some(backup) = &backup {
            if let Err(restore) = std::fs::rename(backup, dir) {
                warn!(path = %backup.display(), error = %restore, "could not restore previous index");
            }
        }
        return Err(anyhow!(e).context(format!("publishing {}", dir.display())));
    }
    if let Some(backup) = backup {
        if let Err(e) = std::fs::remove_dir_all(&backup) {
            warn!(path = %backup.display(), error = %e, "could not remove previous index");
        }
    }
    Ok(())
}

fn entries_to_record_batch(entries: &[(usize, &IndexEntry)], dim: usize) -> Result<RecordBatch> {
    let schema = build_chunks_schema(dim as i32);
    let mut positions = Vec::with_capacity(entries.len());
    let mut ids = Vec::new();
    let mut sources = Vec::new();
    let mut doc_ids = Vec::new();
    let mut titles = Vec::new();
    let mut pages: Vec<Option<i32>> = Vec::new();
    let mut paths: Vec<Option<String>> = Vec::new();
    let mut contents = Vec::new();
    let mut chunk_indices = Vec::new();
    let mut totals = Vec::new();
    let mut overlaps = Vec::new();
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
    for (pos, e) in entries {
        let c = &e.chunk;
        positions.push(*pos as i64);
        ids.push(c.id.clone());
        sources.push(c.metadata.source.as_str().to_string());
        doc_ids.push(c.metadata.id.clone());
        titles.push(c.metadata.title.clone());
        pages.push(c.metadata.page.map(|p| p as i32));
        paths.push(c.metadata.path.clone());
        contents.push(c.text.clone());
        chunk_indices.push(c.chunk_index as i32);
        totals.push(c.total_chunks as i32);
        overlaps.push(c.overlap as i32);
        vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
    }
    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(positions)),
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(doc_ids)),
            Arc::new(StringArray::from(titles)),
            Arc::new(Int32Array::from(pages)),
            Arc::new(StringArray::from(paths)),
            Arc::new(StringArray::from(contents)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(Int32Array::from(totals)),
            Arc::new(Int32Array::from(overlaps)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim as i32)),
        ],
    )?)
}

async fn write_tables(index: &VectorIndex, dir: &Path) -> Result<()> {
    let conn = open_db(dir).await?;
    let dim = index.dim();
    let schema = build_chunks_schema(dim as i32);
    let numbered: Vec<(usize, &IndexEntry)> = index.entries().iter().enumerate().collect();
    if numbered.is_empty() {
        create_empty(&conn, CHUNKS_TABLE, schema).await?;
    } else {
        let batches = numbered
            .chunks(WRITE_BATCH)
            .map(|b| entries_to_record_batch(b, dim).map_err(|e| arrow_schema::ArrowError::ExternalError(e.into())))
            .collect::<Vec<_>>();
        let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), schema));
        conn.create_table(CHUNKS_TABLE, reader).execute().await?;
    }
    write_meta(
        &conn,
        &[
            (KEY_EMBEDDER, index.embedder_id().to_string()),
            (KEY_DIM, dim.to_string()),
            (KEY_FINGERPRINT, index.fingerprint().to_string()),
            (KEY_BUILT_AT, index.built_at().to_rfc3339()),
            (KEY_ENTRIES, index.len().to_string()),
        ],
    )
    .await
}

/// Read the manifest of a saved index; `None` when `dir` holds no index.
pub async fn read_manifest(dir: &Path) -> Result<Option<IndexManifest>> {
    if !dir.exists() {
        return Ok(None);
    }
    let conn = open_db(dir).await?;
    let mut meta = read_meta(&conn).await?;
    let (Some(embedder_id), Some(dim), Some(fingerprint)) =
        (meta.remove(KEY_EMBEDDER), meta.remove(KEY_DIM), meta.remove(KEY_FINGERPRINT))
    else {
        return Ok(None);
    };
    Ok(Some(IndexManifest {
        embedder_id,
        dim: dim.parse().context("meta dim")?,
        fingerprint,
        built_at: meta.remove(KEY_BUILT_AT).unwrap_or_default(),
        entries: meta.remove(KEY_ENTRIES).and_then(|v| v.parse().ok()).unwrap_or(0),
    }))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("chunks.{name} column missing or mistyped"))
}

fn batch_to_entries(batch: &RecordBatch, out: &mut Vec<(i64, IndexEntry)>) -> Result<()> {
    let positions = column::<Int64Array>(batch, "position")?;
    let ids = column::<StringArray>(batch, "id")?;
    let sources = column::<StringArray>(batch, "source")?;
    let doc_ids = column::<StringArray>(batch, "doc_id")?;
    let titles = column::<StringArray>(batch, "title")?;
    let pages = column::<Int32Array>(batch, "page")?;
    let paths = column::<StringArray>(batch, "path")?;
    let contents = column::<StringArray>(batch, "content")?;
    let chunk_indices = column::<Int32Array>(batch, "chunk_index")?;
    let totals = column::<Int32Array>(batch, "total_chunks")?;
    let overlaps = column::<Int32Array>(batch, "overlap")?;
    let vectors = column::<FixedSizeListArray>(batch, "vector")?;
    for i in 0..batch.num_rows() {
        if !vectors.is_valid(i) {
            return Err(anyhow!("row {} has no vector", ids.value(i)));
        }
        let metadata = DocumentMetadata {
            source: sources.value(i).parse::<SourceTag>()?,
            id: doc_ids.value(i).to_string(),
            title: titles.value(i).to_string(),
            page: (!pages.is_null(i)).then(|| pages.value(i) as u32),
            path: (!paths.is_null(i)).then(|| paths.value(i).to_string()),
        };
        let chunk = Chunk {
            id: ids.value(i).to_string(),
            text: contents.value(i).to_string(),
            metadata,
            chunk_index: chunk_indices.value(i) as usize,
            total_chunks: totals.value(i) as usize,
            overlap: overlaps.value(i) as usize,
        };
        let inner = vectors.value(i);
        let vector = inner.as_primitive::<Float32Type>().values().to_vec();
        out.push((positions.value(i), IndexEntry { chunk, vector }));
    }
    Ok(())
}

impl VectorIndex {
    /// Persist to `dir`, replacing whatever was there.
    pub async fn save(&self, dir: &Path) -> Result<()> {
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let staging = sibling(dir, "staging")?;
        if let Err(e) = write_tables(self, &staging).await {
            discard(&staging);
            return Err(e.context(format!("writing index to {}", staging.display())));
        }

        swap_into_place(&staging, dir)?;
        info!(dir = %dir.display(), entries = self.len(), "index saved");
        Ok(())
    }

    /// Load a saved index for use with `embedder`. Entries come back in
    /// their original order. The files are trusted as written by `save`.
    pub async fn load(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if !dir.exists() {
            return Err(Error::MissingInput { path: dir.to_path_buf(), reason: "no saved index".into() }.into());
        }
        let manifest = read_manifest(dir)
            .await?
            .ok_or_else(|| Error::Storage(format!("{} has no index metadata", dir.display())))?;
        if manifest.embedder_id != embedder.id() || manifest.dim != embedder.dim() {
            return Err(Error::SchemaMismatch {
                path: dir.to_path_buf(),
                expected: format!(
                    "index built with {} (d{}) but embedder is {} (d{})",
                    manifest.embedder_id,
                    manifest.dim,
                    embedder.id(),
                    embedder.dim()
                ),
            }
            .into());
        }

        let conn = open_db(dir).await?;
        let table = conn.open_table(CHUNKS_TABLE).execute().await?;
        let mut rows: Vec<(i64, IndexEntry)> = Vec::new();
        let mut stream = table.query().execute().await?;
        while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
            batch_to_entries(&batch, &mut rows)?;
        }
        rows.sort_by_key(|(pos, _)| *pos);
        let entries: Vec<IndexEntry> = rows.into_iter().map(|(_, e)| e).collect();
        if entries.iter().any(|e| e.vector.len() != manifest.dim) {
            return Err(Error::Storage(format!("{} holds vectors of the wrong dimension", dir.display())).into());
        }

        let built_at = DateTime::parse_from_rfc3339(&manifest.built_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        info!(dir = %dir.display(), entries = entries.len(), embedder = %manifest.embedder_id, "index loaded");
        Ok(VectorIndex::from_parts(entries, embedder, manifest.fingerprint, built_at))
    }
}
