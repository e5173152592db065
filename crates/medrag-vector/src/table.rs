//! LanceDB connection and the key/value `meta` table of a saved index.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use arrow_schema::Schema;
use chrono::Utc;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};

use crate::schema::{build_meta_schema, META_TABLE};

pub async fn open_db(dir: &Path) -> Result<Connection> {
    Ok(connect(&dir.to_string_lossy()).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// Create `name` with zero rows unless it already exists.
pub async fn create_empty(conn: &Connection, name: &str, schema: Arc<Schema>) -> Result<()> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(name, Box::new(iter)).execute().await?;
    Ok(())
}

/// Upsert all pairs in one batch; `key` is unique.
pub async fn write_meta(conn: &Connection, pairs: &[(&str, String)]) -> Result<()> {
    let schema = build_meta_schema();
    let now = Utc::now().timestamp_millis();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(pairs.iter().map(|(k, _)| *k))),
            Arc::new(StringArray::from_iter_values(pairs.iter().map(|(_, v)| v.as_str()))),
            Arc::new(TimestampMillisecondArray::from(vec![now; pairs.len()])),
        ],
    )?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema.clone()));
    if !table_exists(conn, META_TABLE).await? {
        conn.create_table(META_TABLE, reader).execute().await?;
        return Ok(());
    }
    let table = conn.open_table(META_TABLE).execute().await?;
    let mut merge = table.merge_insert(&["key"]);
    merge.when_matched_update_all(None).when_not_matched_insert_all();
    let _ = merge.execute(reader).await?;
    Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("meta.{name} column missing"))
}

/// Every key/value pair; empty when the table is absent.
pub async fn read_meta(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut meta = HashMap::new();
    if !table_exists(conn, META_TABLE).await? {
        return Ok(meta);
    }
    let table = conn.open_table(META_TABLE).execute().await?;
    let mut stream = table.query().execute().await?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        let (keys, values) = (string_column(&batch, "key")?, string_column(&batch, "value")?);
        for i in 0..batch.num_rows() {
            meta.insert(keys.value(i).to_string(), values.value(i).to_string());
        }
    }
    Ok(meta)
}
