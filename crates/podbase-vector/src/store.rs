//! LanceDB connection and collection housekeeping.

use anyhow::{anyhow, Result};
use arrow_array::{RecordBatchIterator, StringArray};
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection, Table};
use std::collections::HashSet;
use std::sync::Arc;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

/// Create the collection if it does not exist yet. Safe to call on every
/// run; an existing collection is left untouched.
pub async fn ensure_collection(
    conn: &Connection,
    name: &str,
    schema: Arc<arrow_schema::Schema>,
) -> Result<()> {
    let names = conn.table_names().execute().await?;
    if names.contains(&name.to_string()) {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(name, Box::new(iter)).execute().await?;
    tracing::info!(collection = name, "created vector collection");
    Ok(())
}

/// Full streaming scan of the primary-key column. Bounded by the store's
/// batch paging; fine for collections in the single-digit millions.
pub async fn existing_chunk_ids(table: &Table) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();
    let mut stream = table.query().execute().await?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        let col = batch
            .column_by_name("chunk_id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow!("chunk_id column missing"))?;
        for i in 0..batch.num_rows() {
            ids.insert(col.value(i).to_string());
        }
    }
    Ok(ids)
}
